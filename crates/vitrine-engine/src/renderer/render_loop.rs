use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::time::{FrameHandle, FrameScheduler};

use super::RenderCallback;

/// Runs the render callback once per scheduler tick until stopped.
///
/// At most one frame is pending at any time.
pub(crate) struct RenderLoop {
    scheduler: FrameScheduler,
    render: RefCell<Option<RenderCallback>>,
    frame: Cell<Option<FrameHandle>>,
    stopped: Cell<bool>,
    frames: Cell<u64>,
}

impl RenderLoop {
    pub(crate) fn new(scheduler: FrameScheduler) -> Rc<Self> {
        Rc::new(Self {
            scheduler,
            render: RefCell::new(None),
            frame: Cell::new(None),
            stopped: Cell::new(false),
            frames: Cell::new(0),
        })
    }

    pub(crate) fn start(self: &Rc<Self>, render: RenderCallback) {
        if self.stopped.get() {
            return;
        }
        *self.render.borrow_mut() = Some(render);
        if self.frame.get().is_none() {
            self.schedule();
        }
    }

    /// Cancels the pending frame and drops the callback. Idempotent.
    pub(crate) fn stop(&self) {
        self.stopped.set(true);
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        let render = self.render.borrow_mut().take();
        drop(render);
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames.get()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.frame.get().is_some()
    }

    fn schedule(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let handle = self.scheduler.request_frame(move |_| {
            if let Some(render_loop) = weak.upgrade() {
                render_loop.run_frame();
            }
        });
        self.frame.set(Some(handle));
    }

    fn run_frame(self: &Rc<Self>) {
        self.frame.set(None);

        let taken = self.render.borrow_mut().take();
        let Some(mut render) = taken else { return };
        render();
        self.frames.set(self.frames.get() + 1);

        // The callback may have stopped the loop.
        if self.stopped.get() {
            return;
        }
        *self.render.borrow_mut() = Some(render);
        self.schedule();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(counter: &Rc<Cell<u32>>) -> RenderCallback {
        let counter = counter.clone();
        Box::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn one_render_per_tick() {
        let scheduler = FrameScheduler::new();
        let render_loop = RenderLoop::new(scheduler.clone());
        let count = Rc::new(Cell::new(0));
        render_loop.start(counting(&count));

        for _ in 0..3 {
            scheduler.tick();
        }
        assert_eq!(count.get(), 3);
        assert_eq!(render_loop.frames(), 3);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn stop_cancels_and_releases() {
        let scheduler = FrameScheduler::new();
        let render_loop = RenderLoop::new(scheduler.clone());
        let count = Rc::new(Cell::new(0));
        render_loop.start(counting(&count));

        render_loop.stop();
        render_loop.stop();
        assert!(!scheduler.has_pending());
        assert_eq!(Rc::strong_count(&count), 1);

        render_loop.start(counting(&count));
        scheduler.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn callback_may_stop_its_own_loop() {
        let scheduler = FrameScheduler::new();
        let render_loop = RenderLoop::new(scheduler.clone());
        let count = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&render_loop);
        let c = count.clone();
        render_loop.start(Box::new(move || {
            c.set(c.get() + 1);
            if let Some(l) = weak.upgrade() {
                l.stop();
            }
        }));

        scheduler.tick();
        scheduler.tick();
        assert_eq!(count.get(), 1);
        assert!(!render_loop.is_pending());
    }
}
