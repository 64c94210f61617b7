//! Keyed reactive store: explicit `set`/`get` with per-key watchers.
//!
//! Every write to a watched key hands each watcher a snapshot of the whole
//! state. Keys beginning with `$` are reserved: writes apply but never notify.

mod state;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub use state::{StoreError, StoreState};

/// Callback invoked with a snapshot of the state. Compared by pointer identity.
pub type Watcher<T> = Rc<dyn Fn(&T)>;

/// Wraps a closure as a [`Watcher`]. Keep the returned handle to call [`Store::off`].
pub fn watcher<T: 'static>(f: impl Fn(&T) + 'static) -> Watcher<T> {
    Rc::new(f)
}

fn same_watcher<T>(a: &Watcher<T>, b: &Watcher<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub struct Store<T: StoreState> {
    inner: Rc<StoreInner<T>>,
}

struct StoreInner<T> {
    state: RefCell<T>,
    watchers: RefCell<HashMap<String, Vec<Watcher<T>>>>,
}

impl<T: StoreState> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: StoreState> Store<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                watchers: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<T::Value> {
        self.inner.state.borrow().get(key)
    }

    /// Clone of the whole state.
    pub fn snapshot(&self) -> T {
        self.inner.state.borrow().clone()
    }

    /// Applies the write, then notifies every watcher of `key` in registration order.
    ///
    /// Watchers may call back into the store, including `set`.
    pub fn set(&self, key: &str, value: T::Value) -> Result<(), StoreError> {
        self.inner.state.borrow_mut().set(key, value)?;

        if key.starts_with('$') {
            return Ok(());
        }

        let watchers = self
            .inner
            .watchers
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default();

        for watcher in watchers {
            // Skip watchers removed by an earlier watcher in this round.
            if !self.is_watching(key, &watcher) {
                continue;
            }
            let snapshot = self.snapshot();
            watcher(&snapshot);
        }
        Ok(())
    }

    /// Registers `watcher` on every key in `keys`.
    ///
    /// With `immediate`, the watcher runs once with the current state before
    /// this returns. Registering the same watcher twice on a key is a no-op.
    pub fn on(&self, keys: &[&str], watcher: Watcher<T>, immediate: bool) {
        if immediate {
            let snapshot = self.snapshot();
            watcher(&snapshot);
        }

        let mut watchers = self.inner.watchers.borrow_mut();
        for key in keys {
            let list = watchers.entry((*key).to_owned()).or_default();
            if !list.iter().any(|w| same_watcher(w, &watcher)) {
                list.push(Rc::clone(&watcher));
            }
        }
    }

    /// [`Store::on`] with `immediate` set.
    pub fn watch(&self, keys: &[&str], watcher: Watcher<T>) {
        self.on(keys, watcher, true);
    }

    /// Removes `watcher` from every key in `keys`. Unknown pairs are ignored.
    pub fn off(&self, keys: &[&str], watcher: &Watcher<T>) {
        let mut watchers = self.inner.watchers.borrow_mut();
        for key in keys {
            if let Some(list) = watchers.get_mut(*key) {
                list.retain(|w| !same_watcher(w, watcher));
            }
        }
    }

    /// Registers `f` on `keys` and returns a guard that removes it when dropped.
    pub fn subscribe(
        &self,
        keys: &[&str],
        f: impl Fn(&T) + 'static,
        immediate: bool,
    ) -> Subscription<T> {
        let watcher: Watcher<T> = Rc::new(f);
        self.on(keys, Rc::clone(&watcher), immediate);
        Subscription {
            store: self.clone(),
            keys: keys.iter().map(|k| (*k).to_owned()).collect(),
            watcher,
        }
    }

    pub fn watcher_count(&self, key: &str) -> usize {
        self.inner.watchers.borrow().get(key).map_or(0, Vec::len)
    }

    fn is_watching(&self, key: &str, watcher: &Watcher<T>) -> bool {
        self.inner
            .watchers
            .borrow()
            .get(key)
            .is_some_and(|list| list.iter().any(|w| same_watcher(w, watcher)))
    }
}

/// Watcher registration that ends when dropped. See [`Store::subscribe`].
#[must_use = "dropping a Subscription unregisters its watcher"]
pub struct Subscription<T: StoreState> {
    store: Store<T>,
    keys: Vec<String>,
    watcher: Watcher<T>,
}

impl<T: StoreState> Subscription<T> {
    /// Unregisters now instead of at drop.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<T: StoreState> Drop for Subscription<T> {
    fn drop(&mut self) {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        self.store.off(&keys, &self.watcher);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    use super::*;

    type State = BTreeMap<String, i32>;

    fn store() -> Store<State> {
        let mut initial = State::new();
        initial.insert("count".into(), 0);
        initial.insert("size".into(), 10);
        Store::new(initial)
    }

    fn recorder() -> (Rc<RefCell<Vec<State>>>, Watcher<State>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let w = watcher({
            let seen = seen.clone();
            move |s: &State| seen.borrow_mut().push(s.clone())
        });
        (seen, w)
    }

    // ── notification ──────────────────────────────────────────────────────

    #[test]
    fn two_watchers_get_identical_snapshots() {
        let store = store();
        let (first, w1) = recorder();
        let (second, w2) = recorder();
        store.on(&["count"], w1, false);
        store.on(&["count"], w2, false);

        store.set("count", 3).unwrap();

        assert_eq!(first.borrow().len(), 1);
        assert_eq!(*first.borrow(), *second.borrow());
        assert_eq!(first.borrow()[0]["count"], 3);
        assert_eq!(first.borrow()[0]["size"], 10);
    }

    #[test]
    fn only_watchers_of_written_key_fire() {
        let store = store();
        let (seen, w) = recorder();
        store.on(&["size"], w, false);

        store.set("count", 1).unwrap();
        assert!(seen.borrow().is_empty());

        store.set("size", 11).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn immediate_runs_before_return() {
        let store = store();
        let (seen, w) = recorder();
        store.watch(&["count"], w);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0]["count"], 0);
    }

    #[test]
    fn reserved_keys_mutate_silently() {
        let store = store();
        let (seen, w) = recorder();
        store.on(&["$cache"], w, false);

        store.set("$cache", 99).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(store.get("$cache"), Some(99));
    }

    // ── registration ──────────────────────────────────────────────────────

    #[test]
    fn duplicate_registration_is_ignored() {
        let store = store();
        let (seen, w) = recorder();
        store.on(&["count"], w.clone(), false);
        store.on(&["count", "count"], w, false);
        assert_eq!(store.watcher_count("count"), 1);

        store.set("count", 1).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn off_removes_and_tolerates_unknown() {
        let store = store();
        let (seen, w) = recorder();
        store.on(&["count", "size"], w.clone(), false);

        store.off(&["count", "missing"], &w);
        store.set("count", 1).unwrap();
        assert!(seen.borrow().is_empty());

        store.set("size", 1).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn watcher_removed_mid_round_is_skipped() {
        let store = store();
        let (seen, victim) = recorder();
        let remover = watcher({
            let store = store.clone();
            let victim = victim.clone();
            move |_: &State| store.off(&["count"], &victim)
        });
        store.on(&["count"], remover, false);
        store.on(&["count"], victim, false);

        store.set("count", 1).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn subscription_unregisters_on_drop() {
        let store = store();
        let runs = Rc::new(Cell::new(0));
        let sub = store.subscribe(
            &["count", "size"],
            {
                let runs = runs.clone();
                move |_: &State| runs.set(runs.get() + 1)
            },
            true,
        );
        assert_eq!(runs.get(), 1);

        store.set("size", 2).unwrap();
        assert_eq!(runs.get(), 2);

        drop(sub);
        assert_eq!(store.watcher_count("count"), 0);
        assert_eq!(store.watcher_count("size"), 0);
        store.set("count", 5).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn cancel_unregisters_before_scope_end() {
        let store = store();
        let runs = Rc::new(Cell::new(0));
        let sub = store.subscribe(
            &["count"],
            {
                let runs = runs.clone();
                move |_: &State| runs.set(runs.get() + 1)
            },
            false,
        );
        assert_eq!(store.watcher_count("count"), 1);

        sub.cancel();
        assert_eq!(store.watcher_count("count"), 0);
        store.set("count", 1).unwrap();
        assert_eq!(runs.get(), 0);
    }

    // ── re-entrancy ───────────────────────────────────────────────────────

    #[test]
    fn watcher_may_write_other_keys() {
        let store = store();
        let derived_runs = Rc::new(Cell::new(0));

        store.on(
            &["count"],
            watcher({
                let store = store.clone();
                move |s: &State| {
                    store.set("size", s["count"] * 10).unwrap();
                }
            }),
            false,
        );
        store.on(
            &["size"],
            watcher({
                let runs = derived_runs.clone();
                move |_: &State| runs.set(runs.get() + 1)
            }),
            false,
        );

        store.set("count", 4).unwrap();
        assert_eq!(store.get("size"), Some(40));
        assert_eq!(derived_runs.get(), 1);
    }
}
