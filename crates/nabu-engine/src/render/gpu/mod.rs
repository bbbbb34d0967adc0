//! wgpu-backed render API family.
//!
//! One [`WgpuRenderApi`] per engine owns the wgpu instance, adapter, device and
//! queue. Each [`WgpuWindowRenderApi`] owns an offscreen render-target texture
//! and, when bound to an OS surface, blits it to the surface after every render
//! callback.

mod api;
mod init;
mod surface;
mod window;

pub use api::WgpuRenderApi;
pub use init::WgpuInit;
pub use surface::SurfaceErrorAction;
pub use window::WgpuWindowRenderApi;

pub(crate) use api::GpuShared;
