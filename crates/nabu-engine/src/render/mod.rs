//! Render API families and the per-window render APIs they create.
//!
//! A [`RenderApi`] stands for one GPU backend family. Each window gets its own
//! [`WindowRenderApi`], which owns exactly one native render-target texture.

mod api;
mod events;
mod native;
mod target;
pub mod gpu;

pub use api::{RenderApi, RenderApiKind, WindowApiId, WindowApiInfo, WindowApiTracker, WindowRenderApi};
pub use events::{EventHub, FramebufferResized, Subscription};
pub use native::{NativeContext, NativeHandle, SurfaceHandle, SurfaceSource};
pub use target::{NativeTexture, RenderTarget};
