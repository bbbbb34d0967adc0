use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backend::{BackendRegistry, DrawingBackend};
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::render::RenderApi;
use crate::window::{WindowFactory, WindowRoster, WindowingPlatform};

use super::{Application, EngineConfiguration, EngineInfo, EngineSettings};

/// Binds a drawing backend, a render API and a windowing platform together and
/// drives an [`Application`] through its lifecycle.
pub struct DrawingEngine {
    registry: Arc<BackendRegistry>,
    render_api: Arc<dyn RenderApi>,
    platform: Box<dyn WindowingPlatform>,
    backend: Arc<dyn DrawingBackend>,
    dispatcher: Arc<dyn Dispatcher>,
    settings: EngineSettings,
    roster: WindowRoster,
    backend_ready: bool,
    disposed: AtomicBool,
}

impl DrawingEngine {
    /// Registers the configured backend and dispatcher with `registry`.
    ///
    /// Fails with [`EngineError::DuplicateInitialization`] if the registry
    /// already holds a backend.
    pub fn new(registry: Arc<BackendRegistry>, config: EngineConfiguration) -> Result<Self> {
        let EngineConfiguration {
            render_api,
            platform,
            backend,
            dispatcher,
            settings,
        } = config;

        if settings.render_api != render_api.kind() {
            log::warn!(
                "settings ask for {} but the engine was given a {} render API",
                settings.render_api,
                render_api.kind()
            );
        }

        registry.register(backend.clone(), dispatcher.clone())?;
        log::info!(
            "engine ready: backend `{}`, {} render API, {} platform",
            backend.name(),
            render_api.kind(),
            platform.name()
        );

        Ok(Self {
            registry,
            render_api,
            platform,
            backend,
            dispatcher,
            settings,
            roster: WindowRoster::new(),
            backend_ready: false,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn render_api(&self) -> &Arc<dyn RenderApi> {
        &self.render_api
    }

    pub fn platform_mut(&mut self) -> &mut dyn WindowingPlatform {
        self.platform.as_mut()
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Windows created through this engine that are still open.
    pub fn windows(&self) -> &WindowRoster {
        &self.roster
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            render_api: self.render_api.kind(),
            platform: self.platform.name(),
            backend: self.backend.name().to_owned(),
            hardware_accelerated: self.backend.is_hardware_accelerated(),
        }
    }

    /// Host-embedded mode: initializes the drawing backend and returns.
    ///
    /// The host owns the loop and the windows. Repeated calls are no-ops.
    pub fn run(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.initialize_backend()
    }

    /// Runs `app` to completion.
    ///
    /// Order: `app.initialize`, `app.create_main_window`, window initialize,
    /// backend initialize, `app.run`, then the window's host loop. The first
    /// failure aborts the sequence and is returned.
    pub fn run_with_app<A: Application>(&mut self, app: &mut A) -> Result<()> {
        self.ensure_live()?;

        let info = self.info();
        app.initialize(&info)?;

        let mut window = {
            let mut factory = WindowFactory::new(
                self.platform.as_mut(),
                self.render_api.clone(),
                self.roster.clone(),
            );
            app.create_main_window(&mut factory, &self.settings)?
        };

        window.initialize()?;
        self.initialize_backend()?;
        app.run(&mut window)?;
        window.show()?;

        log::info!("main window {} finished", window.id());
        Ok(())
    }

    /// Releases the drawing backend. Only the first call does anything.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        log::debug!("disposing drawing backend `{}`", self.backend.name());
        self.backend.dispose().await;
        log::info!("engine disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn initialize_backend(&mut self) -> Result<()> {
        if !self.backend_ready {
            self.registry.initialize(self.render_api.clone())?;
            self.backend_ready = true;
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(EngineError::InvalidState("engine is disposed"));
        }
        Ok(())
    }
}
