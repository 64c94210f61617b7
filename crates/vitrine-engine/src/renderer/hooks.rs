use crate::panel::Panel;
use crate::reactive::{Runtime, Signal};
use crate::surface::Surface;
use crate::time::FrameScheduler;

use super::RendererError;

/// Per-frame draw function produced by [`RendererHooks::setup_render`].
pub type RenderCallback = Box<dyn FnMut()>;

/// Shared handles a renderer's hooks work against.
///
/// `width` and `height` track the surface's backing-store size and are
/// updated on every resize notification, before the next frame runs.
#[derive(Clone)]
pub struct RendererCtx {
    pub runtime: Runtime,
    pub surface: Surface,
    pub scheduler: FrameScheduler,
    pub width: Signal<u32>,
    pub height: Signal<u32>,
    pub pixel_ratio: f64,
}

impl RendererCtx {
    pub fn new(runtime: &Runtime, surface: Surface, scheduler: FrameScheduler) -> Self {
        Self {
            width: runtime.signal(0),
            height: runtime.signal(0),
            runtime: runtime.clone(),
            surface,
            scheduler,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }
}

/// Backend- and demo-specific steps of renderer initialization.
///
/// [`Renderer`](super::Renderer) calls these in order: panel controls, then
/// context acquisition (concurrently with the first resize), then render setup.
#[allow(async_fn_in_trait)]
pub trait RendererHooks: 'static {
    /// Backend handle produced by [`RendererHooks::acquire_context`].
    type Context: 'static;

    /// Acquires the rendering context.
    ///
    /// Fails with [`RendererError::ContextUnsupported`] when the backend is
    /// absent and [`RendererError::AdapterOrDeviceUnavailable`] when no device
    /// can be obtained.
    async fn acquire_context(&mut self, cx: &RendererCtx) -> Result<Self::Context, RendererError>;

    /// Adds demo parameters to the panel. Called before context acquisition.
    fn setup_panel_controls(&mut self, _panel: &Panel, _cx: &RendererCtx) {}

    /// Builds pipelines and resources and returns the per-frame callback.
    ///
    /// Effects created here should be owned by the returned callback so that
    /// disposing the renderer releases them.
    async fn setup_render(
        &mut self,
        context: Self::Context,
        cx: &RendererCtx,
    ) -> Result<RenderCallback, RendererError>;
}
