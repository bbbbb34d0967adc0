//! Nabu engine crate.
//!
//! Binds a pluggable drawing backend to a GPU render API family and a
//! windowing platform, marshals GPU work onto the thread owning the GPU
//! context, and pools presentable images for a host compositor.

pub mod backend;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod render;
pub mod swapchain;
pub mod time;
pub mod window;

pub mod coords;
pub mod logging;

#[cfg(test)]
mod testing;

pub use backend::{BackendRegistry, DrawingBackend};
pub use crate::core::{Application, DrawingEngine, EngineConfiguration, EngineInfo, EngineSettings};
pub use error::{EngineError, Result};
