use thiserror::Error;

use crate::reactive::ReactiveError;

/// Failures surfaced by renderer initialization.
///
/// Errors are local to one renderer; a failed renderer disposes itself and
/// leaves the shared reactive graph and scheduler untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    /// The requested rendering backend is absent on this host.
    #[error("rendering context is not supported: {0}")]
    ContextUnsupported(String),

    /// No adapter could be found, or the device request was refused.
    #[error("no usable GPU adapter or device: {0}")]
    AdapterOrDeviceUnavailable(String),

    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("program link failed: {0}")]
    ProgramLink(String),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}
