use crate::render::RenderApiKind;
use crate::window::{Window, WindowFactory};

use super::EngineSettings;

/// What an application learns about the engine before any window exists.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub render_api: RenderApiKind,
    pub platform: &'static str,
    pub backend: String,
    pub hardware_accelerated: bool,
}

/// Application contract driven by [`DrawingEngine::run_with_app`].
///
/// [`DrawingEngine::run_with_app`]: super::DrawingEngine::run_with_app
pub trait Application {
    /// First hook, before any window is created.
    fn initialize(&mut self, engine: &EngineInfo) -> anyhow::Result<()> {
        let _ = engine;
        Ok(())
    }

    /// Creates the main window. The default builds one from the engine settings.
    fn create_main_window(
        &mut self,
        factory: &mut WindowFactory<'_>,
        settings: &EngineSettings,
    ) -> anyhow::Result<Window> {
        Ok(factory.create(&settings.main_window())?)
    }

    /// Called once the window and backend are ready, right before the host
    /// loop starts. This is where callbacks get attached.
    fn run(&mut self, window: &mut Window) -> anyhow::Result<()>;
}
