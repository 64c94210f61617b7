use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::error::ReactiveError;
use super::runtime::{NodeId, NodeKind, NodeState, Run, Runtime};

/// A side effect that re-runs whenever a value it read changes.
///
/// The effect runs once at creation. Each run re-records its dependencies, so
/// a value read on one run but not the next stops triggering it.
///
/// Dropping the handle disposes the effect.
#[must_use = "an effect is disposed as soon as its handle is dropped"]
pub struct Effect {
    runtime: Runtime,
    id: NodeId,
    inner: RefCell<Option<Rc<EffectInner>>>,
}

struct EffectInner {
    body: RefCell<Box<dyn FnMut()>>,
}

impl Run for EffectInner {
    fn run(&self) -> Result<bool, ReactiveError> {
        let mut body = self
            .body
            .try_borrow_mut()
            .map_err(|_| ReactiveError::Misuse("effect re-entered its own body"))?;
        body();
        Ok(false)
    }
}

impl Effect {
    pub(crate) fn new(runtime: &Runtime, body: impl FnMut() + 'static) -> Self {
        let id = runtime.create_node(NodeKind::Effect, NodeState::Dirty);
        let inner = Rc::new(EffectInner { body: RefCell::new(Box::new(body)) });
        let runner: Weak<dyn Run> = Rc::downgrade(&inner) as Weak<EffectInner>;
        runtime.attach_runner(id, runner);

        let effect = Self {
            runtime: runtime.clone(),
            id,
            inner: RefCell::new(Some(inner)),
        };
        runtime.run_effect_now(id);
        effect
    }

    /// Stops the effect. Later writes to its sources no longer run it.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        let inner = self.inner.borrow_mut().take();
        if inner.is_some() {
            self.runtime.dispose_node(self.id);
        }
        drop(inner);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().is_none()
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
