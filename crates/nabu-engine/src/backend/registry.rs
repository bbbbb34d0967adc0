use std::sync::Arc;

use state::InitCell;

use crate::dispatch::{Dispatcher, DispatcherExt};
use crate::error::{EngineError, Result};
use crate::render::RenderApi;

use super::DrawingBackend;

struct Binding {
    backend: Arc<dyn DrawingBackend>,
    dispatcher: Arc<dyn Dispatcher>,
}

/// Holds the one drawing backend (and its dispatcher) for a process.
///
/// Create one and share it by `Arc` with everything that draws. Registration is
/// a single write-once claim, so of two racing `register` calls exactly one
/// wins. There is no teardown; the binding lives as long as the registry.
pub struct BackendRegistry {
    binding: InitCell<Binding>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            binding: InitCell::new(),
        }
    }

    /// Binds `backend` and the dispatcher its GPU work must run on.
    ///
    /// Fails with [`EngineError::DuplicateInitialization`] if a backend is
    /// already bound; the existing binding is left untouched.
    pub fn register(
        &self,
        backend: Arc<dyn DrawingBackend>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<()> {
        let claimed = self.binding.set(Binding {
            backend: backend.clone(),
            dispatcher: dispatcher.clone(),
        });
        if !claimed {
            log::warn!("rejected backend `{}`: a backend is already registered", backend.name());
            return Err(EngineError::DuplicateInitialization {
                what: "drawing backend registry",
            });
        }

        backend.attach_dispatcher(dispatcher);
        log::info!("drawing backend `{}` registered", backend.name());
        Ok(())
    }

    /// The active backend.
    pub fn current(&self) -> Result<&Arc<dyn DrawingBackend>> {
        self.binding().map(|b| &b.backend)
    }

    /// The dispatcher bound with the active backend.
    pub fn dispatcher(&self) -> Result<&Arc<dyn Dispatcher>> {
        self.binding().map(|b| &b.dispatcher)
    }

    pub fn has_backend(&self) -> bool {
        self.binding.try_get().is_some()
    }

    /// Runs the backend's GPU setup on the dispatch thread.
    pub fn initialize(&self, render_api: Arc<dyn RenderApi>) -> Result<()> {
        let binding = self.binding()?;
        let backend = binding.backend.clone();
        let kind = render_api.kind();

        binding
            .dispatcher
            .invoke(move || backend.setup(render_api.as_ref()))??;

        log::info!("drawing backend `{}` initialized on {kind}", binding.backend.name());
        Ok(())
    }

    fn binding(&self) -> Result<&Binding> {
        self.binding.try_get().ok_or(EngineError::NotInitialized {
            what: "drawing backend registry",
        })
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
