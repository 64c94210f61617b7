use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};

use crate::panel::{FrameMonitor, Panel, monitor_frame};
use crate::surface::{ResizeEvent, ResizeObserver, ResizeOptions, observe};

use super::render_loop::RenderLoop;
use super::{InitStatus, Lifecycle, LifecycleState, RendererCtx, RendererError, RendererHooks};

/// Title of the panel every renderer creates.
pub const PANEL_TITLE: &str = "Pane";

/// Shared handle to one renderer instance.
///
/// Cloning yields another handle to the same instance, which is how hosts keep
/// a handle to dispose while `init` is suspended.
pub struct Renderer<H: RendererHooks> {
    inner: Rc<RendererInner<H>>,
}

struct RendererInner<H> {
    ctx: RendererCtx,
    hooks: RefCell<Option<H>>,
    panel: RefCell<Option<Panel>>,
    monitor: RefCell<Option<FrameMonitor>>,
    observer: RefCell<Option<ResizeObserver>>,
    render_loop: Rc<RenderLoop>,
    inited: Cell<bool>,
    running: Cell<bool>,
    disposed: Cell<bool>,
}

impl<H: RendererHooks> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: RendererHooks> Renderer<H> {
    pub fn new(hooks: H, ctx: RendererCtx) -> Self {
        let render_loop = RenderLoop::new(ctx.scheduler.clone());
        Self {
            inner: Rc::new(RendererInner {
                ctx,
                hooks: RefCell::new(Some(hooks)),
                panel: RefCell::new(None),
                monitor: RefCell::new(None),
                observer: RefCell::new(None),
                render_loop,
                inited: Cell::new(false),
                running: Cell::new(false),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn ctx(&self) -> &RendererCtx {
        &self.inner.ctx
    }

    pub fn state(&self) -> LifecycleState {
        let inner = &self.inner;
        if inner.disposed.get() {
            LifecycleState::Disposed
        } else if inner.running.get() {
            LifecycleState::Running
        } else if inner.inited.get() {
            LifecycleState::Initializing
        } else {
            LifecycleState::Uninitialized
        }
    }

    pub fn panel(&self) -> Option<Panel> {
        self.inner.panel.borrow().clone()
    }

    /// Number of times the render callback has run.
    pub fn frames_rendered(&self) -> u64 {
        self.inner.render_loop.frames()
    }

    /// Initializes the renderer and starts its render loop.
    ///
    /// Only the first call does work. If the renderer is disposed while this
    /// is suspended, it resolves to [`InitStatus::Cancelled`] and any context
    /// or error produced afterwards is discarded. On failure the renderer
    /// disposes itself before returning the error.
    pub async fn init(&self) -> Result<InitStatus, RendererError> {
        let inner = &self.inner;
        if inner.disposed.get() {
            return Ok(InitStatus::Cancelled);
        }
        if inner.inited.replace(true) {
            return Ok(InitStatus::AlreadyInitialized);
        }

        let taken = inner.hooks.borrow_mut().take();
        let Some(mut hooks) = taken else {
            return Ok(InitStatus::AlreadyInitialized);
        };

        match self.run_init(&mut hooks).await {
            Ok(status) => Ok(status),
            Err(err) if inner.disposed.get() => {
                log::debug!("renderer init error after dispose ignored: {err}");
                Ok(InitStatus::Cancelled)
            }
            Err(err) => {
                log::error!("renderer init failed: {err}");
                self.dispose();
                Err(err)
            }
        }
    }

    async fn run_init(&self, hooks: &mut H) -> Result<InitStatus, RendererError> {
        let inner = &self.inner;
        let cx = inner.ctx.clone();

        let panel = Panel::new(PANEL_TITLE);
        *inner.panel.borrow_mut() = Some(panel.clone());
        hooks.setup_panel_controls(&panel, &cx);
        if inner.disposed.get() {
            return Ok(InitStatus::Cancelled);
        }
        *inner.monitor.borrow_mut() = Some(monitor_frame(&panel, &cx.scheduler));

        let (first_tx, first_rx) = oneshot::channel::<ResizeEvent>();
        let mut first_tx = Some(first_tx);
        let (width, height) = (cx.width.clone(), cx.height.clone());
        let options = ResizeOptions {
            pixel_ratio: cx.pixel_ratio,
            immediate: true,
        };
        let observer = observe(&cx.surface, options, move |event| {
            width.set(event.width);
            height.set(event.height);
            if let Some(tx) = first_tx.take() {
                let _ = tx.send(event);
            }
        });
        *inner.observer.borrow_mut() = Some(observer);

        // A dropped sender (observer disconnected by dispose) must not stall init.
        let first_resize = first_rx.map(|event| Ok::<_, RendererError>(event.ok()));
        let (first, context) = future::try_join(first_resize, hooks.acquire_context(&cx)).await?;

        if inner.disposed.get() {
            drop(context);
            return Ok(InitStatus::Cancelled);
        }
        if let Some(event) = first {
            log::debug!("first resize {}x{}", event.width, event.height);
        }

        let render = hooks.setup_render(context, &cx).await?;
        if inner.disposed.get() {
            drop(render);
            return Ok(InitStatus::Cancelled);
        }

        inner.render_loop.start(render);
        inner.running.set(true);
        log::info!("renderer running");
        Ok(InitStatus::Running)
    }

    /// Tears the renderer down. Safe at any point, idempotent.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.replace(true) {
            return;
        }
        inner.running.set(false);
        inner.render_loop.stop();

        let observer = inner.observer.borrow_mut().take();
        if let Some(observer) = observer {
            observer.disconnect();
        }
        let monitor = inner.monitor.borrow_mut().take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }
        let panel = inner.panel.borrow_mut().take();
        if let Some(panel) = panel {
            panel.dispose();
        }

        log::info!("renderer disposed");
    }

    #[cfg(test)]
    fn has_pending_frame(&self) -> bool {
        self.inner.render_loop.is_pending()
    }
}

impl<H: RendererHooks> Lifecycle for Renderer<H> {
    fn init(&self) -> LocalBoxFuture<'_, Result<InitStatus, RendererError>> {
        Renderer::init(self).boxed_local()
    }

    fn dispose(&self) {
        Renderer::dispose(self);
    }

    fn state(&self) -> LifecycleState {
        Renderer::state(self)
    }

    fn panel(&self) -> Option<Panel> {
        Renderer::panel(self)
    }
}
