//! Logging setup.
//!
//! Engine code logs through the `log` facade only; `env_logger` is installed
//! here for binaries that want a ready-made sink.

mod init;

pub use init::{init_logging, LoggingConfig};
