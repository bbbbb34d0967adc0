use thiserror::Error;

use crate::render::RenderApiKind;

/// Result alias used by engine-owned operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Failures surfaced by the engine itself.
///
/// Collaborators (backends, platforms, applications) report through
/// `anyhow::Error`; those are carried unchanged in [`EngineError::Host`].
/// Per-frame presentation failures never show up here, see
/// [`PresentFault`](crate::swapchain::PresentFault).
#[derive(Debug, Error)]
pub enum EngineError {
    /// A set-once resource was initialized a second time.
    #[error("{what} is already initialized")]
    DuplicateInitialization { what: &'static str },

    /// An operation ran before the resource it depends on existed.
    #[error("{what} is not initialized")]
    NotInitialized { what: &'static str },

    /// The requested render API family has no implementation on this host.
    #[error("{api} render API is not supported by {by}")]
    UnsupportedBackend { api: RenderApiKind, by: &'static str },

    /// A lifecycle operation was called in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Dispatched work was dropped (or panicked) before producing a result.
    #[error("dispatched work was dropped before it completed")]
    DispatchCanceled,

    /// Failure reported by a backend, platform or application.
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl EngineError {
    /// Returns `true` for errors that mean "initialized twice".
    pub fn is_duplicate_initialization(&self) -> bool {
        matches!(self, Self::DuplicateInitialization { .. })
    }

    /// Returns `true` for errors that mean "used before initialization".
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized { .. })
    }
}
