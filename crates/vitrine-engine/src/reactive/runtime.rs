use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

use super::computed::Computed;
use super::effect::Effect;
use super::error::ReactiveError;
use super::signal::Signal;

/// Maximum number of times a single effect may run during one flush.
///
/// An effect that writes a signal it also reads re-dirties itself on every run.
/// Past this bound it is skipped for the rest of the flush and an error is logged.
pub const MAX_EFFECT_RERUNS: u32 = 100;

/// Generational index into the node arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: u32,
    generation: u32,
}

/// Freshness of a node. Ordered so that marking only ever raises it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NodeState {
    Clean,
    /// A transitive source may have changed; sources must be pulled first.
    Check,
    /// A direct source changed; the node must re-run.
    Dirty,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Signal,
    Computed,
    Effect,
}

/// Type-erased body of a computed or an effect.
pub(crate) trait Run {
    /// Evaluates the node. Returns whether its observable value changed.
    fn run(&self) -> Result<bool, ReactiveError>;
}

struct Node {
    kind: NodeKind,
    state: NodeState,
    running: bool,
    /// Effects only: sitting in the flush queue.
    queued: bool,
    /// The last evaluation did not complete.
    failed: bool,
    sources: Vec<NodeId>,
    subscribers: Vec<NodeId>,
    runner: Option<Weak<dyn Run>>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// One entry of the evaluation stack. `observer` is `None` inside `untrack`.
struct Frame {
    observer: Option<NodeId>,
    cyclic: bool,
}

#[derive(Default)]
struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    stack: Vec<Frame>,
    queue: VecDeque<NodeId>,
    flushing: bool,
}

impl Graph {
    fn insert(&mut self, kind: NodeKind, state: NodeState) -> NodeId {
        let node = Node {
            kind,
            state,
            running: false,
            queued: false,
            failed: false,
            sources: Vec::new(),
            subscribers: Vec::new(),
            runner: None,
        };

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        for source in &node.sources {
            if let Some(source) = self.node_mut(*source) {
                source.subscribers.retain(|s| *s != id);
            }
        }
        for subscriber in &node.subscribers {
            if let Some(subscriber) = self.node_mut(*subscriber) {
                subscriber.sources.retain(|s| *s != id);
            }
        }
        self.queue.retain(|queued| *queued != id);

        Some(node)
    }

    fn link(&mut self, observer: NodeId, source: NodeId) {
        if self.node(source).is_none() {
            return;
        }
        let Some(node) = self.node_mut(observer) else { return };
        if node.sources.contains(&source) {
            return;
        }
        node.sources.push(source);
        if let Some(source) = self.node_mut(source) {
            source.subscribers.push(observer);
        }
    }

    fn clear_sources(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else { return };
        let sources = std::mem::take(&mut node.sources);
        for source in sources {
            if let Some(source) = self.node_mut(source) {
                source.subscribers.retain(|s| *s != id);
            }
        }
    }

    fn subscribers_of(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.subscribers.clone()).unwrap_or_default()
    }

    /// Raises `id` to at least `state`, propagating `Check` through computeds
    /// and queueing every stale effect that is not already queued.
    ///
    /// A computed propagates even when it was already stale: one left dirty
    /// by a failed evaluation has subscribers that were never told.
    fn mark(&mut self, id: NodeId, state: NodeState) {
        let mut work = vec![(id, state)];
        let mut visited = HashSet::new();

        while let Some((id, state)) = work.pop() {
            let Some(node) = self.node_mut(id) else { continue };
            node.state = node.state.max(state);

            match node.kind {
                NodeKind::Effect => {
                    if node.state != NodeState::Clean && !node.queued {
                        node.queued = true;
                        self.queue.push_back(id);
                    }
                }
                NodeKind::Computed => {
                    let downstream = node.subscribers.clone();
                    if visited.insert(id) {
                        work.extend(downstream.into_iter().map(|s| (s, NodeState::Check)));
                    }
                }
                NodeKind::Signal => {}
            }
        }
    }

    /// Flags every frame from the one evaluating `id` to the top as cyclic.
    fn poison_from(&mut self, id: NodeId) {
        if let Some(pos) = self.stack.iter().position(|f| f.observer == Some(id)) {
            for frame in &mut self.stack[pos..] {
                frame.cyclic = true;
            }
        }
    }
}

/// Explicit reactive context.
///
/// A `Runtime` owns the dependency graph: the node arena, the evaluation stack
/// used for dependency tracking, and the queue of effects awaiting a re-run.
/// Every signal, computed and effect is created from a runtime and keeps a
/// handle to it; there is no ambient or thread-local state.
///
/// Cloning a `Runtime` yields another handle to the same graph.
#[derive(Clone, Default)]
pub struct Runtime {
    graph: Rc<RefCell<Graph>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that notifies dependents only when a write changes its value.
    pub fn signal<T>(&self, initial: T) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        Signal::new(self, initial, Some(|a: &T, b: &T| a == b))
    }

    /// Creates a signal that notifies dependents on every write.
    pub fn signal_always<T>(&self, initial: T) -> Signal<T>
    where
        T: Clone + 'static,
    {
        Signal::new(self, initial, None)
    }

    /// Creates a lazily evaluated, memoized derivation.
    pub fn computed<T, F>(&self, derive: F) -> Computed<T>
    where
        T: Clone + PartialEq + 'static,
        F: FnMut() -> T + 'static,
    {
        Computed::new(self, derive)
    }

    /// Creates an effect and runs it once immediately.
    pub fn effect<F>(&self, run: F) -> Effect
    where
        F: FnMut() + 'static,
    {
        Effect::new(self, run)
    }

    /// Runs `f` without recording any reads as dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.graph.borrow_mut().stack.push(Frame { observer: None, cyclic: false });
        let guard = StackGuard { runtime: self, node: None };
        let out = f();
        drop(guard);
        self.flush_if_idle();
        out
    }

    /// Number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.node.is_some())
            .count()
    }

    pub(crate) fn create_node(&self, kind: NodeKind, state: NodeState) -> NodeId {
        self.graph.borrow_mut().insert(kind, state)
    }

    pub(crate) fn attach_runner(&self, id: NodeId, runner: Weak<dyn Run>) {
        if let Some(node) = self.graph.borrow_mut().node_mut(id) {
            node.runner = Some(runner);
        }
    }

    pub(crate) fn dispose_node(&self, id: NodeId) {
        let removed = match self.graph.try_borrow_mut() {
            Ok(mut graph) => graph.remove(id),
            Err(_) => {
                log::warn!("reactive node dropped while the graph was borrowed; leaking its slot");
                None
            }
        };
        drop(removed);
    }

    /// `(sources, subscribers)` edge counts of a node.
    pub(crate) fn edge_counts(&self, id: NodeId) -> (usize, usize) {
        self.graph
            .borrow()
            .node(id)
            .map_or((0, 0), |n| (n.sources.len(), n.subscribers.len()))
    }

    pub(crate) fn track_read(&self, source: NodeId) {
        let mut graph = self.graph.borrow_mut();
        let observer = match graph.stack.last() {
            Some(Frame { observer: Some(observer), .. }) => *observer,
            _ => return,
        };
        graph.link(observer, source);
    }

    pub(crate) fn notify_write(&self, id: NodeId) {
        {
            let mut graph = self.graph.borrow_mut();
            for subscriber in graph.subscribers_of(id) {
                graph.mark(subscriber, NodeState::Dirty);
            }
        }
        self.flush_if_idle();
    }

    /// Brings a computed up to date and records the read.
    ///
    /// A failed read is recorded too, so the reader re-runs once `id`
    /// recovers. The cyclic read of a node still evaluating is not.
    pub(crate) fn read_computed(&self, id: NodeId) -> Result<(), ReactiveError> {
        let result = self.pull(id);
        let running = self.graph.borrow().node(id).is_some_and(|n| n.running);
        if result.is_ok() || !running {
            self.track_read(id);
        }
        self.flush_if_idle();
        result
    }

    pub(crate) fn run_effect_now(&self, id: NodeId) {
        if let Err(err) = self.run_node(id) {
            log::error!("effect evaluation failed: {err}");
        }
        self.flush_if_idle();
    }

    pub(crate) fn frame_is_cyclic(&self) -> bool {
        self.graph.borrow().stack.last().is_some_and(|f| f.cyclic)
    }

    fn state_of(&self, id: NodeId) -> Option<NodeState> {
        self.graph.borrow().node(id).map(|n| n.state)
    }

    fn pull(&self, id: NodeId) -> Result<(), ReactiveError> {
        {
            let mut graph = self.graph.borrow_mut();
            if graph.node(id).is_some_and(|n| n.running) {
                graph.poison_from(id);
                return Err(ReactiveError::CycleDetected);
            }
        }
        self.update_if_necessary(id)
    }

    fn update_if_necessary(&self, id: NodeId) -> Result<(), ReactiveError> {
        let (kind, state, sources) = {
            let graph = self.graph.borrow();
            let Some(node) = graph.node(id) else { return Ok(()) };
            let sources = if node.state == NodeState::Check {
                node.sources.clone()
            } else {
                Vec::new()
            };
            (node.kind, node.state, sources)
        };

        if state == NodeState::Clean {
            return Ok(());
        }

        // Sources are pulled in read order; a changed computed marks `id` dirty.
        for source in sources {
            let is_computed = self
                .graph
                .borrow()
                .node(source)
                .is_some_and(|n| n.kind == NodeKind::Computed);
            if is_computed {
                if let Err(err) = self.pull(source) {
                    if kind != NodeKind::Effect {
                        return Err(err);
                    }
                    // The effect re-runs and observes the failure through its own reads.
                    if let Some(node) = self.graph.borrow_mut().node_mut(id) {
                        node.state = NodeState::Dirty;
                    }
                }
            }
            if self.state_of(id) == Some(NodeState::Dirty) {
                break;
            }
        }

        if self.state_of(id) == Some(NodeState::Dirty) {
            return self.run_node(id);
        }

        if let Some(node) = self.graph.borrow_mut().node_mut(id) {
            node.state = NodeState::Clean;
        }
        Ok(())
    }

    fn run_node(&self, id: NodeId) -> Result<(), ReactiveError> {
        let (runner, recovering) = {
            let mut graph = self.graph.borrow_mut();
            graph.clear_sources(id);
            let Some(node) = graph.node_mut(id) else { return Ok(()) };
            node.state = NodeState::Clean;
            node.running = true;
            let recovering = node.failed;
            let runner = node.runner.as_ref().and_then(Weak::upgrade);
            graph.stack.push(Frame { observer: Some(id), cyclic: false });
            (runner, recovering)
        };

        let mut guard = StackGuard { runtime: self, node: Some((id, false)) };
        let outcome = match &runner {
            Some(runner) => runner.run(),
            None => Ok(false),
        };
        let cyclic = self.frame_is_cyclic();
        guard.node = Some((id, !cyclic && outcome.is_ok()));
        drop(guard);
        drop(runner);

        if cyclic {
            return Err(ReactiveError::CycleDetected);
        }

        // Readers of a failed evaluation saw an error, so recovery is a change.
        if outcome? || recovering {
            let mut graph = self.graph.borrow_mut();
            for subscriber in graph.subscribers_of(id) {
                graph.mark(subscriber, NodeState::Dirty);
            }
        }
        Ok(())
    }

    fn flush_if_idle(&self) {
        let idle = {
            let graph = self.graph.borrow();
            !graph.flushing && graph.stack.is_empty() && !graph.queue.is_empty()
        };
        if idle {
            self.flush();
        }
    }

    /// Drains the effect queue. Runs synchronously to completion.
    fn flush(&self) {
        {
            let mut graph = self.graph.borrow_mut();
            if graph.flushing {
                return;
            }
            graph.flushing = true;
        }
        let _guard = FlushGuard { runtime: self };

        let mut runs: HashMap<NodeId, u32> = HashMap::new();
        loop {
            let next = {
                let mut graph = self.graph.borrow_mut();
                let next = graph.queue.pop_front();
                if let Some(node) = next.and_then(|id| graph.node_mut(id)) {
                    node.queued = false;
                }
                next
            };
            let Some(id) = next else { break };

            let count = runs.entry(id).or_insert(0);
            *count += 1;
            if *count > MAX_EFFECT_RERUNS {
                if *count == MAX_EFFECT_RERUNS + 1 {
                    log::error!(
                        "effect re-triggered itself more than {MAX_EFFECT_RERUNS} times in one flush; skipping it"
                    );
                }
                if let Some(node) = self.graph.borrow_mut().node_mut(id) {
                    node.state = NodeState::Clean;
                }
                continue;
            }

            if let Err(err) = self.update_if_necessary(id) {
                log::error!("effect evaluation failed: {err}");
            }
        }
    }
}

/// Pops an evaluation frame, also on unwind.
///
/// `node` carries the evaluated node and whether it completed; an incomplete
/// evaluation leaves the node dirty and failed so the next read retries it.
struct StackGuard<'a> {
    runtime: &'a Runtime,
    node: Option<(NodeId, bool)>,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut graph) = self.runtime.graph.try_borrow_mut() else { return };
        graph.stack.pop();
        if let Some((id, completed)) = self.node {
            if let Some(node) = graph.node_mut(id) {
                node.running = false;
                node.failed = !completed;
                if !completed {
                    node.state = NodeState::Dirty;
                }
            }
        }
    }
}

struct FlushGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut graph) = self.runtime.graph.try_borrow_mut() {
            graph.flushing = false;
        }
    }
}
