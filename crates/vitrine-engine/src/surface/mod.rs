//! Host surface model and resize observation.
//!
//! A [`Surface`] stands in for the drawable the host lays out: it has a layout
//! box size (what the host reports) and a backing-store size in pixels (what
//! the renderer draws into). The host pushes layout changes through
//! [`Surface::notify_box_size`]; observers turn them into backing-store
//! resizes and [`ResizeEvent`]s.

mod observer;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use observer::{ResizeEvent, ResizeObserver, ResizeOptions, observe, resize_to_display_size};

/// Backing-store size of a freshly created surface.
pub const DEFAULT_BACKING_SIZE: SurfaceSize = SurfaceSize::new(300, 150);

/// Layout box size reported by the host, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxSize {
    pub inline_size: f64,
    pub block_size: f64,
}

impl BoxSize {
    pub const fn new(inline_size: f64, block_size: f64) -> Self {
        Self { inline_size, block_size }
    }
}

/// Backing-store size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel size for a layout box at `pixel_ratio`, never below 1×1.
    pub fn from_box(size: BoxSize, pixel_ratio: f64) -> Self {
        Self {
            width: scale_dimension(size.inline_size, pixel_ratio),
            height: scale_dimension(size.block_size, pixel_ratio),
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        DEFAULT_BACKING_SIZE
    }
}

fn scale_dimension(value: f64, pixel_ratio: f64) -> u32 {
    let scaled = (value * pixel_ratio).floor();
    // NaN and negatives clamp to 1 too.
    if scaled >= 1.0 {
        scaled.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

type Listener = Rc<RefCell<dyn FnMut(&Surface, BoxSize)>>;

/// Shared handle to a host surface.
#[derive(Clone)]
pub struct Surface {
    inner: Rc<SurfaceInner>,
}

struct SurfaceInner {
    layout: Cell<BoxSize>,
    backing: Cell<SurfaceSize>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("layout", &self.layout_size())
            .field("backing", &self.backing_size())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Surface {
    pub fn new(layout: BoxSize) -> Self {
        Self {
            inner: Rc::new(SurfaceInner {
                layout: Cell::new(layout),
                backing: Cell::new(DEFAULT_BACKING_SIZE),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    pub fn layout_size(&self) -> BoxSize {
        self.inner.layout.get()
    }

    pub fn backing_size(&self) -> SurfaceSize {
        self.inner.backing.get()
    }

    pub fn set_backing_size(&self, size: SurfaceSize) {
        self.inner.backing.set(size);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Records a new layout size and notifies listeners in registration order.
    ///
    /// A listener removed by an earlier one in the same round is skipped.
    pub fn notify_box_size(&self, size: BoxSize) {
        self.inner.layout.set(size);

        let listeners = self.inner.listeners.borrow().clone();
        for (id, listener) in listeners {
            if !self.has_listener(id) {
                continue;
            }
            match listener.try_borrow_mut() {
                Ok(mut listener) => listener(self, size),
                Err(_) => log::warn!("resize listener {id} re-entered; nested notification dropped"),
            }
        }
    }

    pub(crate) fn add_listener(&self, listener: Listener) -> u64 {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    fn has_listener(&self, id: u64) -> bool {
        self.inner.listeners.borrow().iter().any(|(l, _)| *l == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_box_floors_and_clamps() {
        assert_eq!(SurfaceSize::from_box(BoxSize::new(0.0, 0.0), 1.0), SurfaceSize::new(1, 1));
        assert_eq!(SurfaceSize::from_box(BoxSize::new(100.7, 50.2), 1.0), SurfaceSize::new(100, 50));
        assert_eq!(SurfaceSize::from_box(BoxSize::new(100.0, 50.0), 1.5), SurfaceSize::new(150, 75));
        assert_eq!(SurfaceSize::from_box(BoxSize::new(0.4, -3.0), 2.0), SurfaceSize::new(1, 1));
        assert_eq!(SurfaceSize::from_box(BoxSize::new(f64::NAN, 10.0), 1.0), SurfaceSize::new(1, 10));
    }

    #[test]
    fn new_surface_has_default_backing_store() {
        let surface = Surface::new(BoxSize::new(640.0, 480.0));
        assert_eq!(surface.backing_size(), SurfaceSize::new(300, 150));
        assert_eq!(surface.layout_size(), BoxSize::new(640.0, 480.0));
    }
}
