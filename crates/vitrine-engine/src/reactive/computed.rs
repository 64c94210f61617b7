use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::error::ReactiveError;
use super::runtime::{NodeId, NodeKind, NodeState, Run, Runtime};

/// A memoized derivation over other reactive values.
///
/// The derivation runs lazily: not at creation, and afterwards only when it
/// is read after one of its sources changed. Dependents are notified only if
/// the recomputed value differs from the previous one.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    runtime: Runtime,
    id: NodeId,
    value: RefCell<Option<T>>,
    derive: RefCell<Box<dyn FnMut() -> T>>,
}

impl<T: PartialEq + 'static> Run for ComputedInner<T> {
    fn run(&self) -> Result<bool, ReactiveError> {
        let next = {
            let mut derive = self
                .derive
                .try_borrow_mut()
                .map_err(|_| ReactiveError::CycleDetected)?;
            derive()
        };

        // A cyclic read somewhere below leaves the cached value untouched.
        if self.runtime.frame_is_cyclic() {
            return Ok(false);
        }

        let mut value = self.value.borrow_mut();
        if value.as_ref() == Some(&next) {
            return Ok(false);
        }
        *value = Some(next);
        Ok(true)
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.runtime.dispose_node(self.id);
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Computed");
        match self.inner.value.try_borrow() {
            Ok(value) => dbg.field("cached", &*value),
            Err(_) => dbg.field("cached", &"<evaluating>"),
        };
        dbg.finish()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub(crate) fn new(runtime: &Runtime, derive: impl FnMut() -> T + 'static) -> Self {
        let id = runtime.create_node(NodeKind::Computed, NodeState::Dirty);
        let inner = Rc::new(ComputedInner {
            runtime: runtime.clone(),
            id,
            value: RefCell::new(None),
            derive: RefCell::new(Box::new(derive)),
        });
        let runner: Weak<dyn Run> = Rc::downgrade(&inner) as Weak<ComputedInner<T>>;
        runtime.attach_runner(id, runner);
        Self { inner }
    }

    /// Returns the up-to-date value, recording a dependency.
    ///
    /// # Panics
    ///
    /// Panics if the derivation depends on itself. Use [`Computed::try_get`]
    /// to observe the cycle as an error instead.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the up-to-date value, or the reason it cannot be produced.
    pub fn try_get(&self) -> Result<T, ReactiveError> {
        self.inner.runtime.read_computed(self.inner.id)?;
        self.inner
            .value
            .borrow()
            .clone()
            .ok_or(ReactiveError::CycleDetected)
    }

    /// Borrows the up-to-date value, recording a dependency.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ReactiveError> {
        self.inner.runtime.read_computed(self.inner.id)?;
        let value = self.inner.value.borrow();
        value.as_ref().map(f).ok_or(ReactiveError::CycleDetected)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub(crate) fn id(&self) -> NodeId {
        self.inner.id
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn lazy_until_first_read() {
        let rt = Runtime::new();
        let calls = Rc::new(Cell::new(0));
        let s = rt.signal(2);

        let doubled = rt.computed({
            let s = s.clone();
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                s.get() * 2
            }
        });
        assert_eq!(calls.get(), 0);

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(calls.get(), 1);

        s.set(3);
        assert_eq!(calls.get(), 1);
        assert_eq!(doubled.get(), 6);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn try_with_borrows_value() {
        let rt = Runtime::new();
        let s = rt.signal(String::from("abc"));
        let upper = rt.computed({
            let s = s.clone();
            move || s.with(|v| v.to_uppercase())
        });

        assert_eq!(upper.try_with(String::len), Ok(3));
        assert_eq!(upper.get(), "ABC");
    }

    #[test]
    fn self_read_is_a_cycle() {
        let rt = Runtime::new();
        let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));

        let c = rt.computed({
            let slot = slot.clone();
            move || {
                let me = slot.borrow().clone();
                me.map_or(0, |me| me.try_get().unwrap_or(-1) + 1)
            }
        });
        *slot.borrow_mut() = Some(c.clone());

        assert_eq!(c.try_get(), Err(ReactiveError::CycleDetected));
        slot.borrow_mut().take();
    }
}
