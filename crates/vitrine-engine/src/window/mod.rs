//! winit host.
//!
//! Owns the event loop and the window, and translates window events into
//! surface notifications, scheduler ticks and panel interaction.

mod focus;
mod host;

pub use focus::{PanelFocus, PanelKey};
pub use host::{Host, HostCtx, RendererFactory, WindowConfig};
