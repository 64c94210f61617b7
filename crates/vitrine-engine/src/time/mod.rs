//! Frame timing and per-frame callback scheduling.
//!
//! The host owns one [`FrameScheduler`] and ticks it once per presented
//! frame. Everything that wants to run "next frame" (render loops, the
//! frame-time monitor) requests a callback on it.

mod frame_clock;
mod scheduler;

pub use frame_clock::{FrameClock, FrameTime};
pub use scheduler::{FrameHandle, FrameScheduler};
