//! Engine composition: configuration, the application contract and the
//! engine that drives them.

mod app;
mod config;
mod engine;

pub use app::{Application, EngineInfo};
pub use config::{EngineConfiguration, EngineSettings};
pub use engine::DrawingEngine;
