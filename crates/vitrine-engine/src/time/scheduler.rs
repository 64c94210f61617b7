use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use super::{FrameClock, FrameTime};

type FrameCallback = Box<dyn FnOnce(FrameTime)>;

/// Identifies a requested frame callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Host-driven next-frame callback queue.
///
/// Each [`FrameScheduler::tick`] runs the callbacks that were pending when the
/// tick started, in request order. Callbacks requested while a tick is running
/// wait for the next one, so a callback that re-requests itself runs once per
/// frame.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    inner: Rc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    clock: RefCell<FrameClock>,
    queue: RefCell<VecDeque<(u64, FrameCallback)>>,
    next_id: Cell<u64>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: FrameClock) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                clock: RefCell::new(clock),
                ..SchedulerInner::default()
            }),
        }
    }

    pub fn request_frame(&self, callback: impl FnOnce(FrameTime) + 'static) -> FrameHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.queue.borrow_mut().push_back((id, Box::new(callback)));
        FrameHandle(id)
    }

    /// Drops a pending callback. Returns `false` if it already ran or was cancelled.
    pub fn cancel_frame(&self, handle: FrameHandle) -> bool {
        let removed = {
            let mut queue = self.inner.queue.borrow_mut();
            let pos = queue.iter().position(|(id, _)| *id == handle.0);
            pos.and_then(|pos| queue.remove(pos))
        };
        // Dropped outside the borrow; the callback may own scheduler handles.
        removed.is_some()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Runs one frame. Returns how many callbacks ran.
    pub fn tick(&self) -> usize {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&self, now: Instant) -> usize {
        let time = self.inner.clock.borrow_mut().tick_at(now);
        let boundary = self.inner.next_id.get();

        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.inner.queue.borrow_mut();
                match queue.front() {
                    Some((id, _)) if *id < boundary => queue.pop_front(),
                    _ => None,
                }
            };
            let Some((_, callback)) = next else { break };
            callback(time);
            ran += 1;
        }

        log::trace!("frame {} ran {ran} callbacks", time.frame_index);
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn runs_in_request_order() {
        let scheduler = FrameScheduler::new();
        let seen = log();
        for name in ["a", "b", "c"] {
            let seen = seen.clone();
            scheduler.request_frame(move |_| seen.borrow_mut().push(name));
        }

        assert_eq!(scheduler.tick(), 3);
        assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn requests_during_tick_wait_for_next_tick() {
        let scheduler = FrameScheduler::new();
        let seen = log();

        scheduler.request_frame({
            let scheduler = scheduler.clone();
            let seen = seen.clone();
            move |_| {
                seen.borrow_mut().push("outer");
                let seen = seen.clone();
                scheduler.request_frame(move |_| seen.borrow_mut().push("inner"));
            }
        });

        assert_eq!(scheduler.tick(), 1);
        assert_eq!(*seen.borrow(), vec!["outer"]);
        assert_eq!(scheduler.pending_count(), 1);

        assert_eq!(scheduler.tick(), 1);
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn cancel_is_one_shot() {
        let scheduler = FrameScheduler::new();
        let seen = log();
        let handle = scheduler.request_frame({
            let seen = seen.clone();
            move |_| seen.borrow_mut().push("cancelled")
        });

        assert!(scheduler.cancel_frame(handle));
        assert!(!scheduler.cancel_frame(handle));
        assert_eq!(scheduler.tick(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn callback_may_cancel_a_later_one() {
        let scheduler = FrameScheduler::new();
        let seen = log();
        let victim = Rc::new(Cell::new(None));

        scheduler.request_frame({
            let scheduler = scheduler.clone();
            let victim = victim.clone();
            move |_| {
                if let Some(handle) = victim.get() {
                    scheduler.cancel_frame(handle);
                }
            }
        });
        victim.set(Some(scheduler.request_frame({
            let seen = seen.clone();
            move |_| seen.borrow_mut().push("victim")
        })));

        assert_eq!(scheduler.tick(), 1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn callbacks_share_the_tick_time() {
        let start = Instant::now();
        let clock = FrameClock::starting_at(start, Duration::ZERO, Duration::from_secs(1));
        let scheduler = FrameScheduler::with_clock(clock);
        let times = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let times = times.clone();
            scheduler.request_frame(move |t| times.borrow_mut().push((t.frame_index, t.dt_ms())));
        }
        scheduler.tick_at(start + Duration::from_millis(20));

        let times = times.borrow();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], times[1]);
        assert!((times[0].1 - 20.0).abs() < 1e-3);
    }
}
