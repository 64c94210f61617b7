//! Vitrine engine crate.
//!
//! Fine-grained reactive state, a keyed store, a debug panel model and the
//! renderer lifecycle that ties them to a wgpu surface hosted in a winit
//! window.

pub mod device;
pub mod logging;
pub mod panel;
pub mod reactive;
pub mod renderer;
pub mod store;
pub mod surface;
pub mod time;
pub mod window;
