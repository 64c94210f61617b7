//! Demo registry.

mod common;
mod first_triangle;
mod random_triangles;

use clap::ValueEnum;
use vitrine_engine::device::GpuInit;
use vitrine_engine::renderer::{Lifecycle, Renderer};
use vitrine_engine::window::HostCtx;

pub use first_triangle::FirstTriangle;
pub use random_triangles::RandomTriangles;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    /// One triangle; geometry and colors held in a keyed store.
    FirstTriangle,
    /// Instanced random triangles derived from a count signal.
    RandomTriangles,
}

impl DemoKind {
    pub const ALL: [DemoKind; 2] = [DemoKind::FirstTriangle, DemoKind::RandomTriangles];

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            DemoKind::FirstTriangle => "first-triangle",
            DemoKind::RandomTriangles => "random-triangles",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DemoKind::FirstTriangle => "First Triangle",
            DemoKind::RandomTriangles => "Random Triangles",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DemoKind::FirstTriangle => "one triangle with per-vertex colors from a keyed store",
            DemoKind::RandomTriangles => "instanced triangles derived from a count signal",
        }
    }
}

/// Builds the renderer for `kind` against the host's window and surface.
pub fn build(kind: DemoKind, host: &HostCtx) -> Box<dyn Lifecycle> {
    let cx = host.renderer_ctx();
    let window = host.window.clone();
    let init = GpuInit::default();

    match kind {
        DemoKind::FirstTriangle => Box::new(Renderer::new(FirstTriangle::new(window, init), cx)),
        DemoKind::RandomTriangles => {
            let hooks = RandomTriangles::new(window, init, &cx);
            Box::new(Renderer::new(hooks, cx))
        }
    }
}
