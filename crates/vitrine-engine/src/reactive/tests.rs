use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

// ── laziness ──────────────────────────────────────────────────────────────

#[test]
fn unchanged_dependency_means_no_recompute() {
    let rt = Runtime::new();
    let a = rt.signal(1);
    let calls = counter();

    let b = rt.computed({
        let a = a.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            a.get() + 1
        }
    });

    assert_eq!(b.get(), 2);
    assert_eq!(b.get(), 2);
    a.set(1);
    assert_eq!(b.get(), 2);
    assert_eq!(calls.get(), 1);
}

#[test]
fn equal_recompute_does_not_invalidate_downstream() {
    let rt = Runtime::new();
    let n = rt.signal(3);
    let parity_calls = counter();
    let label_calls = counter();

    let parity = rt.computed({
        let n = n.clone();
        let calls = parity_calls.clone();
        move || {
            calls.set(calls.get() + 1);
            n.get() % 2
        }
    });
    let label = rt.computed({
        let parity = parity.clone();
        let calls = label_calls.clone();
        move || {
            calls.set(calls.get() + 1);
            if parity.get() == 0 { "even" } else { "odd" }
        }
    });

    assert_eq!(label.get(), "odd");
    n.set(5);
    assert_eq!(label.get(), "odd");
    assert_eq!(parity_calls.get(), 2);
    assert_eq!(label_calls.get(), 1);
}

// ── glitch freedom ────────────────────────────────────────────────────────

#[test]
fn effect_sees_consistent_computed_once_per_write() {
    let rt = Runtime::new();
    let a = rt.signal(1);
    let b = rt.computed({
        let a = a.clone();
        move || a.get() * 2
    });
    let log = Rc::new(RefCell::new(Vec::new()));

    let _e = rt.effect({
        let b = b.clone();
        let log = log.clone();
        move || log.borrow_mut().push(b.get())
    });
    assert_eq!(*log.borrow(), vec![2]);

    a.set(5);
    assert_eq!(*log.borrow(), vec![2, 10]);
}

#[test]
fn diamond_runs_effect_once_with_fresh_values() {
    let rt = Runtime::new();
    let a = rt.signal(1);
    let left = rt.computed({
        let a = a.clone();
        move || a.get() + 1
    });
    let right = rt.computed({
        let a = a.clone();
        move || a.get() * 10
    });
    let log = Rc::new(RefCell::new(Vec::new()));

    let _e = rt.effect({
        let (a, left, right) = (a.clone(), left.clone(), right.clone());
        let log = log.clone();
        move || log.borrow_mut().push((a.get(), left.get(), right.get()))
    });

    a.set(2);
    assert_eq!(*log.borrow(), vec![(1, 2, 10), (2, 3, 20)]);
}

#[test]
fn effect_behind_unchanged_computed_is_skipped() {
    let rt = Runtime::new();
    let n = rt.signal(2);
    let positive = rt.computed({
        let n = n.clone();
        move || n.get() > 0
    });
    let runs = counter();

    let _e = rt.effect({
        let positive = positive.clone();
        let runs = runs.clone();
        move || {
            positive.get();
            runs.set(runs.get() + 1);
        }
    });

    n.set(7);
    n.set(9);
    assert_eq!(runs.get(), 1);

    n.set(-1);
    assert_eq!(runs.get(), 2);
}

// ── dynamic dependencies ──────────────────────────────────────────────────

#[test]
fn branch_switch_drops_stale_edges() {
    let rt = Runtime::new();
    let use_left = rt.signal(true);
    let left = rt.signal(1);
    let right = rt.signal(100);
    let runs = counter();

    let _e = rt.effect({
        let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
        let runs = runs.clone();
        move || {
            runs.set(runs.get() + 1);
            if use_left.get() { left.get() } else { right.get() };
        }
    });
    assert_eq!(runs.get(), 1);

    use_left.set(false);
    assert_eq!(runs.get(), 2);
    assert_eq!(rt.edge_counts(left.id()).1, 0);

    left.set(2);
    assert_eq!(runs.get(), 2);

    right.set(200);
    assert_eq!(runs.get(), 3);
}

#[test]
fn untracked_read_does_not_subscribe() {
    let rt = Runtime::new();
    let tracked = rt.signal(0);
    let hidden = rt.signal(0);
    let runs = counter();

    let _e = rt.effect({
        let (tracked, hidden) = (tracked.clone(), hidden.clone());
        let runs = runs.clone();
        let rt = rt.clone();
        move || {
            tracked.get();
            rt.untrack(|| hidden.get());
            runs.set(runs.get() + 1);
        }
    });

    hidden.set(1);
    assert_eq!(runs.get(), 1);
    tracked.set(1);
    assert_eq!(runs.get(), 2);
}

// ── disposal ──────────────────────────────────────────────────────────────

#[test]
fn disposed_effect_never_runs_again() {
    let rt = Runtime::new();
    let a = rt.signal(0);
    let b = rt.computed({
        let a = a.clone();
        move || a.get() + 1
    });
    let runs = counter();

    let e = rt.effect({
        let b = b.clone();
        let runs = runs.clone();
        move || {
            b.get();
            runs.set(runs.get() + 1);
        }
    });
    e.dispose();

    for v in 1..5 {
        a.set(v);
    }
    assert_eq!(runs.get(), 1);
    assert_eq!(rt.edge_counts(b.id()).1, 0);
}

#[test]
fn dropping_everything_empties_graph() {
    let rt = Runtime::new();
    {
        let a = rt.signal(1);
        let b = rt.computed({
            let a = a.clone();
            move || a.get() * 2
        });
        let _e = rt.effect({
            let b = b.clone();
            move || {
                b.get();
            }
        });
        assert_eq!(rt.node_count(), 3);
    }
    assert_eq!(rt.node_count(), 0);
}

// ── failure modes ─────────────────────────────────────────────────────────

#[test]
fn mutual_recursion_is_detected() {
    let rt = Runtime::new();
    let other: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));

    let a = rt.computed({
        let other = other.clone();
        move || {
            let b = other.borrow().clone();
            b.map_or(0, |b| b.try_get().unwrap_or(0)) + 1
        }
    });
    let b = rt.computed({
        let a = a.clone();
        move || a.try_get().unwrap_or(0) + 1
    });
    *other.borrow_mut() = Some(b.clone());

    assert_eq!(a.try_get(), Err(ReactiveError::CycleDetected));
    assert_eq!(b.try_get(), Err(ReactiveError::CycleDetected));

    // Breaking the loop lets both evaluate again.
    other.borrow_mut().take();
    assert_eq!(a.try_get(), Ok(1));
    assert_eq!(b.try_get(), Ok(2));
}

#[test]
#[should_panic(expected = "cycle")]
fn get_panics_on_cycle() {
    let rt = Runtime::new();
    let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));
    let c = rt.computed({
        let slot = slot.clone();
        move || slot.borrow().as_ref().map_or(0, |me| me.try_get().unwrap_or(0))
    });
    *slot.borrow_mut() = Some(c.clone());
    c.get();
}

#[test]
fn self_triggering_effect_is_bounded() {
    let rt = Runtime::new();
    let n = rt.signal(0u32);
    let runs = counter();

    let _e = rt.effect({
        let n = n.clone();
        let runs = runs.clone();
        move || {
            runs.set(runs.get() + 1);
            let v = n.get();
            n.set(v + 1);
        }
    });

    // One run at creation plus at most MAX_EFFECT_RERUNS in the flush it caused.
    assert_eq!(runs.get(), 1 + MAX_EFFECT_RERUNS);

    // The graph is still usable afterwards.
    let hits = counter();
    let _p = rt.effect({
        let n = n.clone();
        let hits = hits.clone();
        move || {
            n.peek();
            hits.set(hits.get() + 1);
        }
    });
    assert_eq!(hits.get(), 1);
}

#[test]
fn panicking_derivation_leaves_graph_usable() {
    let rt = Runtime::new();
    let fail = rt.signal(true);
    let c = rt.computed({
        let fail = fail.clone();
        move || {
            if fail.get() {
                panic!("boom");
            }
            42
        }
    });

    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.get()));
    assert!(caught.is_err());

    fail.set(false);
    assert_eq!(c.get(), 42);
}

#[test]
fn effect_recovers_after_transient_cycle_in_flush() {
    let rt = Runtime::new();
    let looping = rt.signal(false);
    let base = rt.signal(1);
    let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));

    let c = rt.computed({
        let (looping, base, slot) = (looping.clone(), base.clone(), slot.clone());
        move || {
            if looping.get() {
                let me = slot.borrow().clone();
                me.map_or(0, |me| me.try_get().unwrap_or(0))
            } else {
                base.get()
            }
        }
    });
    *slot.borrow_mut() = Some(c.clone());

    let log = Rc::new(RefCell::new(Vec::new()));
    let _e = rt.effect({
        let (c, log) = (c.clone(), log.clone());
        move || log.borrow_mut().push(c.try_get())
    });

    looping.set(true);
    assert_eq!(log.borrow().last(), Some(&Err(ReactiveError::CycleDetected)));

    looping.set(false);
    assert_eq!(log.borrow().last(), Some(&Ok(1)));

    base.set(42);
    assert_eq!(log.borrow().last(), Some(&Ok(42)));
}

#[test]
fn effect_recovers_after_panic_in_flush() {
    let rt = Runtime::new();
    let fail = rt.signal(false);
    let direct = rt.signal(0);
    let c = rt.computed({
        let fail = fail.clone();
        move || {
            if fail.get() {
                panic!("boom");
            }
            7
        }
    });

    let runs = Rc::new(RefCell::new(Vec::new()));
    let _e = rt.effect({
        let (c, direct, runs) = (c.clone(), direct.clone(), runs.clone());
        move || runs.borrow_mut().push((c.get(), direct.get()))
    });

    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fail.set(true)));
    assert!(caught.is_err());

    fail.set(false);
    direct.set(5);
    assert_eq!(runs.borrow().last(), Some(&(7, 5)));

    direct.set(6);
    assert_eq!(runs.borrow().last(), Some(&(7, 6)));
}

// ── nesting ───────────────────────────────────────────────────────────────

#[test]
fn write_inside_effect_propagates_after_it_finishes() {
    let rt = Runtime::new();
    let source = rt.signal(1);
    let mirror = rt.signal(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _copy = rt.effect({
        let (source, mirror) = (source.clone(), mirror.clone());
        move || mirror.set(source.get() * 3)
    });
    let _watch = rt.effect({
        let mirror = mirror.clone();
        let seen = seen.clone();
        move || seen.borrow_mut().push(mirror.get())
    });

    source.set(2);
    assert_eq!(*seen.borrow(), vec![3, 6]);
}
