use clap::Parser;
use vitrine_engine::logging::{LoggingConfig, init_logging};
use vitrine_engine::window::{Host, HostCtx, WindowConfig};
use winit::dpi::LogicalSize;

mod demos;

use demos::DemoKind;

/// Runs one wgpu demo in a window with a keyboard-driven debug panel.
///
/// Tab moves between panel controls, arrow keys adjust the focused one and
/// Escape quits.
#[derive(Debug, Parser)]
#[command(name = "vitrine-gallery", version)]
struct Cli {
    /// Demo to run.
    #[arg(long, value_enum, default_value_t = DemoKind::FirstTriangle)]
    demo: DemoKind,

    /// Log filter, e.g. `debug` or `vitrine_engine=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 960.0)]
    width: f64,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 640.0)]
    height: f64,

    /// List the available demos and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    if cli.list {
        for kind in DemoKind::ALL {
            println!("{:<18} {}", kind.name(), kind.description());
        }
        return Ok(());
    }

    let kind = cli.demo;
    log::info!("starting demo `{}`", kind.name());

    let config = WindowConfig {
        title: format!("vitrine · {}", kind.title()),
        initial_size: LogicalSize::new(cli.width, cli.height),
    };
    Host::run(config, Box::new(move |host: &HostCtx| Ok(demos::build(kind, host))))
}
