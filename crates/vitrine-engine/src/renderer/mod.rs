//! Renderer lifecycle coordination.
//!
//! A [`Renderer`] drives one demo from construction to teardown: it builds the
//! debug panel, acquires the rendering context while waiting for the first
//! resize, sets up the per-frame callback and runs it on the frame scheduler.
//! [`Renderer::dispose`] may be called at any point, including while `init`
//! is suspended; later checkpoints observe it and unwind quietly.

mod coordinator;
mod error;
mod hooks;
mod lifecycle;
mod render_loop;

pub use coordinator::{PANEL_TITLE, Renderer};
pub use error::RendererError;
pub use hooks::{RenderCallback, RendererCtx, RendererHooks};
pub use lifecycle::{InitStatus, Lifecycle, LifecycleState};
