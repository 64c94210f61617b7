//! wgpu context acquisition.
//!
//! [`GpuContext::acquire`] negotiates instance, surface, adapter and device,
//! mapping each failure onto [`RendererError`](crate::renderer::RendererError)
//! so renderer hooks can return it directly.

mod context;
mod init;
mod surface;

pub use context::{GpuContext, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
