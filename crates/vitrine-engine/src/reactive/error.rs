use thiserror::Error;

/// Errors raised by the reactive graph.
///
/// Both variants are programmer errors: correct code never observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A read-only accessor was used to write, or a similar contract violation.
    #[error("reactive misuse: {0}")]
    Misuse(&'static str),

    /// A computed value transitively depends on itself.
    #[error("dependency cycle detected while evaluating a computed value")]
    CycleDetected,
}
