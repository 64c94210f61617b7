use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{NodeId, NodeKind, NodeState, Runtime};

/// A writable reactive cell.
///
/// Reading with [`Signal::get`] or [`Signal::with`] inside a computed or an
/// effect records a dependency. [`Signal::peek`] reads without tracking.
///
/// Handles are cheap to clone and share the same value; the node leaves the
/// graph when the last handle is dropped.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    runtime: Runtime,
    id: NodeId,
    value: RefCell<T>,
    equals: Option<fn(&T, &T) -> bool>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.dispose_node(self.id);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    pub(crate) fn new(runtime: &Runtime, value: T, equals: Option<fn(&T, &T) -> bool>) -> Self {
        let id = runtime.create_node(NodeKind::Signal, NodeState::Clean);
        Self {
            inner: Rc::new(SignalInner {
                runtime: runtime.clone(),
                id,
                value: RefCell::new(value),
                equals,
            }),
        }
    }

    /// Borrows the current value, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.runtime.track_read(self.inner.id);
        f(&self.inner.value.borrow())
    }

    /// Replaces the value.
    ///
    /// Signals created with [`Runtime::signal`] skip notification when the new
    /// value equals the current one.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if self.inner.equals.is_some_and(|eq| eq(&current, &value)) {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.inner.runtime.notify_write(self.inner.id);
        }
    }

    /// Mutates the value in place and always notifies.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.inner.runtime.notify_write(self.inner.id);
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn id(&self) -> NodeId {
        self.inner.id
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Returns a copy of the value, recording a dependency.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Returns a copy of the value without recording a dependency.
    pub fn peek(&self) -> T {
        self.inner.value.borrow().clone()
    }
}
