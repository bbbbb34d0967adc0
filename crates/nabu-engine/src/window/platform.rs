use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::coords::PixelSize;
use crate::dispatch::GpuContext;
use crate::error::Result;
use crate::input::InputEvent;
use crate::render::{NativeHandle, RenderApi, SurfaceHandle};

use super::Window;

/// Event delivered by a native window's host loop.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// One update + render tick.
    Tick,
    /// The OS resized the window's framebuffer.
    Resized(PixelSize),
    Input(InputEvent),
    CloseRequested,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Settings a platform creates a window from.
#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub size: PixelSize,
    pub show_on_top: bool,
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "nabu".to_owned(),
            size: PixelSize::new(1280, 720),
            show_on_top: false,
            resizable: true,
        }
    }
}

impl WindowSettings {
    pub fn new(title: impl Into<String>, size: PixelSize) -> Self {
        Self {
            title: title.into(),
            size,
            ..Self::default()
        }
    }
}

/// Platform window owned by a [`Window`].
///
/// The three native-context accessors back the three render API families; a
/// platform that cannot provide one reports
/// [`EngineError::UnsupportedBackend`](crate::EngineError::UnsupportedBackend).
pub trait NativeWindow {
    fn id(&self) -> u64;
    fn title(&self) -> &str;
    fn size(&self) -> PixelSize;

    fn gpu_context(&self) -> Result<Arc<dyn GpuContext>>;
    fn surface_handle(&self) -> Result<SurfaceHandle>;
    fn native_handle(&self) -> NativeHandle;

    fn set_visible(&mut self, visible: bool);
    fn set_topmost(&mut self, on_top: bool);

    /// Runs the host loop until `handler` returns [`LoopControl::Exit`] or the
    /// host itself ends the loop.
    fn run(&mut self, handler: &mut dyn FnMut(HostEvent) -> LoopControl) -> anyhow::Result<()>;

    /// Releases the native window. Idempotent.
    fn dispose(&mut self);
}

/// Creates native windows; one per engine, outliving its windows.
pub trait WindowingPlatform {
    fn name(&self) -> &'static str;

    fn create_native_window(&mut self, settings: &WindowSettings) -> anyhow::Result<Box<dyn NativeWindow>>;
}

/// Ids of windows that have been created and not yet closed.
#[derive(Debug, Clone, Default)]
pub struct WindowRoster {
    live: Arc<Mutex<BTreeSet<u64>>>,
}

impl WindowRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, id: u64) {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).insert(id);
    }

    pub(crate) fn remove(&self, id: u64) {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    pub fn ids(&self) -> Vec<u64> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Window construction handed to the application.
pub struct WindowFactory<'a> {
    platform: &'a mut dyn WindowingPlatform,
    render_api: Arc<dyn RenderApi>,
    roster: WindowRoster,
}

impl<'a> WindowFactory<'a> {
    pub fn new(platform: &'a mut dyn WindowingPlatform, render_api: Arc<dyn RenderApi>, roster: WindowRoster) -> Self {
        Self {
            platform,
            render_api,
            roster,
        }
    }

    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    pub fn create(&mut self, settings: &WindowSettings) -> Result<Window> {
        let native = self.platform.create_native_window(settings)?;
        log::debug!(
            "{} created window {} `{}` at {}",
            self.platform.name(),
            native.id(),
            native.title(),
            native.size()
        );
        Ok(Window::new(native, self.render_api.clone(), settings, self.roster.clone()))
    }
}
