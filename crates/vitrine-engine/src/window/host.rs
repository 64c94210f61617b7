use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::reactive::Runtime;
use crate::renderer::{InitStatus, Lifecycle, RendererCtx};
use crate::surface::{BoxSize, Surface};
use crate::time::FrameScheduler;

use super::focus::{PanelFocus, PanelKey};

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vitrine".to_string(),
            initial_size: LogicalSize::new(960.0, 640.0),
        }
    }
}

/// Everything a renderer factory needs from the host.
pub struct HostCtx {
    pub window: Arc<Window>,
    pub runtime: Runtime,
    pub surface: Surface,
    pub scheduler: FrameScheduler,
}

impl HostCtx {
    /// Renderer context over this host's surface and scheduler.
    ///
    /// The surface reports physical pixels, so the pixel ratio is 1.
    pub fn renderer_ctx(&self) -> RendererCtx {
        RendererCtx::new(&self.runtime, self.surface.clone(), self.scheduler.clone())
    }
}

/// Builds the renderer hosted in the window.
pub type RendererFactory = Box<dyn FnOnce(&HostCtx) -> Result<Box<dyn Lifecycle>>>;

/// winit host for a single renderer.
pub struct Host;

impl Host {
    /// Opens a window, builds the renderer with `factory` and runs until the
    /// window is closed.
    pub fn run(config: WindowConfig, factory: RendererFactory) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = HostState::new(config, factory);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.failure.map_or(Ok(()), Err)
    }
}

struct Entry {
    window: Arc<Window>,
    surface: Surface,
    scheduler: FrameScheduler,
    renderer: Box<dyn Lifecycle>,
    focus: PanelFocus,
}

impl Entry {
    fn notify_size(&self, size: PhysicalSize<u32>) {
        self.surface
            .notify_box_size(BoxSize::new(f64::from(size.width), f64::from(size.height)));
        self.window.request_redraw();
    }

    fn handle_key(&mut self, key: PanelKey) {
        let Some(panel) = self.renderer.panel() else { return };
        self.focus.handle(&panel, key);
    }
}

struct HostState {
    config: WindowConfig,
    factory: Option<RendererFactory>,
    entry: Option<Entry>,
    failure: Option<anyhow::Error>,
}

impl HostState {
    fn new(config: WindowConfig, factory: RendererFactory) -> Self {
        Self {
            config,
            factory: Some(factory),
            entry: None,
            failure: None,
        }
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<Entry> {
        let factory = self
            .factory
            .take()
            .context("renderer factory already consumed")?;

        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let ctx = HostCtx {
            window: window.clone(),
            runtime: Runtime::new(),
            surface: Surface::new(BoxSize::new(f64::from(size.width), f64::from(size.height))),
            scheduler: FrameScheduler::new(),
        };
        let renderer = factory(&ctx).context("failed to build renderer")?;

        match pollster::block_on(renderer.init()).context("renderer initialization failed")? {
            InitStatus::Running => log::info!("renderer running in {}x{} window", size.width, size.height),
            status => log::warn!("renderer init finished as {status:?}"),
        }
        window.request_redraw();

        Ok(Entry {
            window,
            surface: ctx.surface,
            scheduler: ctx.scheduler,
            renderer,
            focus: PanelFocus::default(),
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = self.entry.take() {
            entry.renderer.dispose();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for HostState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        match self.create_entry(event_loop) {
            Ok(entry) => self.entry = Some(entry),
            Err(e) => {
                log::error!("{e:#}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        if let Some(entry) = &self.entry {
            if entry.scheduler.has_pending() {
                entry.window.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_mut() else { return };
        if entry.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(new_size) => entry.notify_size(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.window.inner_size();
                entry.notify_size(size);
            }

            WindowEvent::RedrawRequested => {
                entry.scheduler.tick();
                if entry.scheduler.has_pending() {
                    entry.window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let PhysicalKey::Code(code) = event.physical_key else { return };
                match code {
                    KeyCode::Escape => self.shutdown(event_loop),
                    KeyCode::Tab => entry.handle_key(PanelKey::Next),
                    KeyCode::ArrowUp | KeyCode::ArrowRight => entry.handle_key(PanelKey::Increase),
                    KeyCode::ArrowDown | KeyCode::ArrowLeft => entry.handle_key(PanelKey::Decrease),
                    _ => {}
                }
            }

            _ => {}
        }
    }
}
