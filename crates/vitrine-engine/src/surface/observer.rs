use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{BoxSize, Surface, SurfaceSize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOptions {
    /// Device pixels per layout unit.
    pub pixel_ratio: f64,
    /// Deliver one event synchronously at subscription, from the current layout box.
    pub immediate: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            immediate: false,
        }
    }
}

/// New backing-store size after a layout change. Both dimensions are at least 1.
#[derive(Debug, Clone)]
pub struct ResizeEvent {
    /// The observed surface, already resized.
    pub surface: Surface,
    pub width: u32,
    pub height: u32,
}

impl ResizeEvent {
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

impl PartialEq for ResizeEvent {
    fn eq(&self, other: &Self) -> bool {
        self.surface.ptr_eq(&other.surface) && self.size() == other.size()
    }
}

/// Subscription returned by [`observe`]. Dropping it disconnects.
pub struct ResizeObserver {
    surface: Surface,
    listener: Cell<Option<u64>>,
}

impl ResizeObserver {
    /// Stops delivery. The callback is released. Idempotent.
    pub fn disconnect(&self) {
        if let Some(id) = self.listener.take() {
            self.surface.remove_listener(id);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.listener.get().is_some()
    }
}

impl Drop for ResizeObserver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn effective_ratio(pixel_ratio: f64) -> f64 {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        log::warn!("invalid pixel ratio {pixel_ratio}; using 1.0");
        1.0
    }
}

fn deliver(surface: &Surface, size: BoxSize, pixel_ratio: f64, callback: &mut dyn FnMut(ResizeEvent)) {
    let next = SurfaceSize::from_box(size, pixel_ratio);
    if surface.backing_size() != next {
        surface.set_backing_size(next);
    }
    callback(ResizeEvent {
        surface: surface.clone(),
        width: next.width,
        height: next.height,
    });
}

/// Keeps the surface's backing store in step with its layout box.
///
/// Every notification resizes the backing store to
/// `max(1, floor(box * pixel_ratio))` when that differs from the current size,
/// then calls `callback` exactly once, changed or not.
pub fn observe<F>(surface: &Surface, options: ResizeOptions, mut callback: F) -> ResizeObserver
where
    F: FnMut(ResizeEvent) + 'static,
{
    let pixel_ratio = effective_ratio(options.pixel_ratio);

    if options.immediate {
        deliver(surface, surface.layout_size(), pixel_ratio, &mut callback);
    }

    let id = surface.add_listener(Rc::new(RefCell::new(
        move |surface: &Surface, size: BoxSize| deliver(surface, size, pixel_ratio, &mut callback),
    )));

    ResizeObserver {
        surface: surface.clone(),
        listener: Cell::new(Some(id)),
    }
}

/// Resizes the backing store to the current layout box once.
pub fn resize_to_display_size(surface: &Surface, pixel_ratio: f64) -> SurfaceSize {
    let size = SurfaceSize::from_box(surface.layout_size(), effective_ratio(pixel_ratio));
    surface.set_backing_size(size);
    size
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recording(surface: &Surface, options: ResizeOptions) -> (ResizeObserver, Rc<RefCell<Vec<ResizeEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let observer = observe(surface, options, {
            let events = events.clone();
            move |e| events.borrow_mut().push(e)
        });
        (observer, events)
    }

    fn sizes(events: &RefCell<Vec<ResizeEvent>>) -> Vec<SurfaceSize> {
        events.borrow().iter().map(ResizeEvent::size).collect()
    }

    // ── delivery ──────────────────────────────────────────────────────────

    #[test]
    fn zero_box_yields_one_by_one() {
        let surface = Surface::new(BoxSize::default());
        let (_observer, events) = recording(&surface, ResizeOptions::default());

        surface.notify_box_size(BoxSize::new(0.0, 0.0));

        assert_eq!(sizes(&events), vec![SurfaceSize::new(1, 1)]);
        assert_eq!(surface.backing_size(), SurfaceSize::new(1, 1));
    }

    #[test]
    fn fires_every_notification_even_when_unchanged() {
        let surface = Surface::new(BoxSize::default());
        let (_observer, events) = recording(&surface, ResizeOptions::default());

        surface.notify_box_size(BoxSize::new(200.0, 100.0));
        surface.notify_box_size(BoxSize::new(200.4, 100.9));

        assert_eq!(events.borrow().len(), 2);
        assert_eq!(events.borrow()[1].size(), SurfaceSize::new(200, 100));
    }

    #[test]
    fn pixel_ratio_scales_backing_store() {
        let surface = Surface::new(BoxSize::default());
        let options = ResizeOptions { pixel_ratio: 2.0, ..ResizeOptions::default() };
        let (_observer, events) = recording(&surface, options);

        surface.notify_box_size(BoxSize::new(320.0, 240.0));

        assert_eq!(surface.backing_size(), SurfaceSize::new(640, 480));
        assert_eq!(events.borrow()[0].size(), SurfaceSize::new(640, 480));
    }

    #[test]
    fn immediate_fires_from_current_layout() {
        let surface = Surface::new(BoxSize::new(200.0, 100.0));
        let options = ResizeOptions { immediate: true, ..ResizeOptions::default() };
        let (_observer, events) = recording(&surface, options);

        assert_eq!(sizes(&events), vec![SurfaceSize::new(200, 100)]);
        assert_eq!(surface.backing_size(), SurfaceSize::new(200, 100));
    }

    #[test]
    fn event_carries_the_observed_surface() {
        let first = Surface::new(BoxSize::default());
        let second = Surface::new(BoxSize::default());
        let (_a, first_events) = recording(&first, ResizeOptions::default());
        let (_b, second_events) = recording(&second, ResizeOptions::default());

        first.notify_box_size(BoxSize::new(30.0, 20.0));
        second.notify_box_size(BoxSize::new(30.0, 20.0));

        let a = first_events.borrow()[0].clone();
        let b = second_events.borrow()[0].clone();
        assert!(a.surface.ptr_eq(&first));
        assert!(b.surface.ptr_eq(&second));
        assert_eq!(a.surface.backing_size(), a.size());
        assert_ne!(a, b);
    }

    // ── disconnect ────────────────────────────────────────────────────────

    #[test]
    fn disconnect_is_permanent_and_idempotent() {
        let surface = Surface::new(BoxSize::default());
        let (observer, events) = recording(&surface, ResizeOptions::default());

        observer.disconnect();
        observer.disconnect();
        assert!(!observer.is_connected());
        assert_eq!(surface.listener_count(), 0);

        surface.notify_box_size(BoxSize::new(10.0, 10.0));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn drop_disconnects_and_releases_callback() {
        let surface = Surface::new(BoxSize::default());
        let (observer, events) = recording(&surface, ResizeOptions::default());
        assert_eq!(Rc::strong_count(&events), 2);

        drop(observer);
        assert_eq!(Rc::strong_count(&events), 1);
        assert_eq!(surface.listener_count(), 0);
    }

    #[test]
    fn callback_may_disconnect_a_later_observer() {
        let surface = Surface::new(BoxSize::default());
        let second: Rc<RefCell<Option<ResizeObserver>>> = Rc::new(RefCell::new(None));

        let _first = observe(&surface, ResizeOptions::default(), {
            let second = second.clone();
            move |_| {
                if let Some(observer) = second.borrow().as_ref() {
                    observer.disconnect();
                }
            }
        });
        let (observer, events) = recording(&surface, ResizeOptions::default());
        *second.borrow_mut() = Some(observer);

        surface.notify_box_size(BoxSize::new(5.0, 5.0));
        assert!(events.borrow().is_empty());
    }

    // ── one-shot ──────────────────────────────────────────────────────────

    #[test]
    fn resize_to_display_size_fits_layout() {
        let surface = Surface::new(BoxSize::new(99.9, 0.2));
        assert_eq!(resize_to_display_size(&surface, 1.0), SurfaceSize::new(99, 1));
        assert_eq!(surface.backing_size(), SurfaceSize::new(99, 1));
    }
}
