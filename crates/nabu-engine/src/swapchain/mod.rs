//! Pool of presentable images shared with a host compositor.
//!
//! The swapchain hands out one image per frame through [`Swapchain::begin_draw`]
//! and presents it when the returned [`DrawScope`] drops. An image is only
//! reused once its previous present has fully completed, and only when the pool
//! holds at least [`REUSE_THRESHOLD`] such images; otherwise a fresh image is
//! allocated. Present faults evict the faulted image and nothing else.

mod compositor;
mod interop;
mod pool;
mod present;

pub use compositor::HostCompositor;
pub use interop::{FrameSink, WgpuInterop};
pub use pool::{DrawScope, Swapchain, REUSE_THRESHOLD};
pub use present::{PresentCompleter, PresentFault, PresentHandle, PresentStatus};
