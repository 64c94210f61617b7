use futures::future::LocalBoxFuture;

use crate::panel::Panel;

use super::RendererError;

/// Observable renderer state. `Disposed` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Disposed,
}

/// Successful outcome of `init`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InitStatus {
    /// The render loop is running.
    Running,
    /// `init` had already been called; nothing was done.
    AlreadyInitialized,
    /// The renderer was disposed before initialization could finish.
    Cancelled,
}

/// Object-safe view of a renderer, for hosts that hold demos of different types.
pub trait Lifecycle {
    fn init(&self) -> LocalBoxFuture<'_, Result<InitStatus, RendererError>>;

    fn dispose(&self);

    fn state(&self) -> LifecycleState;

    fn panel(&self) -> Option<Panel>;
}
