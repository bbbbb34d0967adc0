use std::sync::Arc;

use crate::backend::DrawingBackend;
use crate::coords::PixelSize;
use crate::dispatch::Dispatcher;
use crate::render::{RenderApi, RenderApiKind};
use crate::window::{WindowSettings, WindowingPlatform};

/// User-facing engine settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Title of the main window.
    pub title: String,
    /// Initial size of the main window.
    pub size: PixelSize,
    /// Family the host should build its render API for.
    pub render_api: RenderApiKind,
    pub show_on_top: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            title: "nabu".to_owned(),
            size: PixelSize::new(1280, 720),
            render_api: RenderApiKind::Vulkan,
            show_on_top: false,
        }
    }
}

impl EngineSettings {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, size: PixelSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_render_api(mut self, kind: RenderApiKind) -> Self {
        self.render_api = kind;
        self
    }

    pub fn with_show_on_top(mut self, on_top: bool) -> Self {
        self.show_on_top = on_top;
        self
    }

    /// Settings for the main window.
    pub fn main_window(&self) -> WindowSettings {
        WindowSettings {
            show_on_top: self.show_on_top,
            ..WindowSettings::new(self.title.clone(), self.size)
        }
    }
}

/// Collaborators an engine is built from. Fixed for the engine's lifetime.
pub struct EngineConfiguration {
    pub render_api: Arc<dyn RenderApi>,
    pub platform: Box<dyn WindowingPlatform>,
    pub backend: Arc<dyn DrawingBackend>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub settings: EngineSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_window_carries_settings() {
        let settings = EngineSettings::default()
            .with_title("studio")
            .with_size(PixelSize::new(640, 480))
            .with_show_on_top(true);

        let window = settings.main_window();
        assert_eq!(window.title, "studio");
        assert_eq!(window.size, PixelSize::new(640, 480));
        assert!(window.show_on_top);
    }
}
