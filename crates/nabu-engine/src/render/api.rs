use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::coords::PixelSize;

use super::{FramebufferResized, NativeContext, NativeTexture, Subscription};

/// GPU backend family.
///
/// Closed on purpose: code that needs a family-specific shape (the native
/// context a window passes to its render API, for one) matches exhaustively,
/// so adding a family is a compile-checked change.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderApiKind {
    OpenGl,
    Vulkan,
    Web,
}

impl RenderApiKind {
    pub const ALL: [Self; 3] = [Self::OpenGl, Self::Vulkan, Self::Web];

    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenGl => "OpenGL",
            Self::Vulkan => "Vulkan",
            Self::Web => "Web",
        }
    }
}

impl fmt::Display for RenderApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderApiKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gl" | "opengl" => Ok(Self::OpenGl),
            "vk" | "vulkan" => Ok(Self::Vulkan),
            "web" | "webgpu" => Ok(Self::Web),
            other => anyhow::bail!("unknown render API `{other}` (expected opengl, vulkan or web)"),
        }
    }
}

/// Identity of one window render API within its family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WindowApiId(u64);

impl WindowApiId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Snapshot describing one live window render API.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WindowApiInfo {
    pub id: WindowApiId,
    pub size: PixelSize,
    pub has_instance: bool,
}

/// One GPU backend family, created once per engine.
pub trait RenderApi: Any + Send + Sync {
    fn kind(&self) -> RenderApiKind;

    /// Creates a new per-window render API without a native instance yet.
    fn create_window_api(&self) -> anyhow::Result<Box<dyn WindowRenderApi>>;

    /// Window render APIs currently alive.
    fn window_apis(&self) -> Vec<WindowApiInfo>;

    /// Lets backends reach the concrete family type during setup.
    fn as_any(&self) -> &dyn Any;
}

/// Per-window render API.
///
/// Owns one render-target texture sized to the window framebuffer.
pub trait WindowRenderApi: Send {
    fn id(&self) -> WindowApiId;

    /// Creates the native instance from the family-specific native context.
    fn create_instance(&mut self, native: NativeContext, size: PixelSize) -> anyhow::Result<()>;

    /// Releases the native instance. No-op if none exists.
    fn destroy_instance(&mut self);

    fn has_instance(&self) -> bool;

    /// Current framebuffer size.
    fn size(&self) -> PixelSize;

    /// Forwards a new window size. Raises [`FramebufferResized`] if the
    /// framebuffer actually changed.
    fn resize(&mut self, size: PixelSize) -> anyhow::Result<()>;

    /// Every subscriber receives every notification.
    fn subscribe_resized(&self) -> Subscription<FramebufferResized>;

    /// Backend-native handle of the current render-target texture.
    fn texture(&self) -> Option<NativeTexture>;

    /// Runs one render tick: `draw` draws into the current texture, then the
    /// family presents it.
    fn render(&mut self, draw: &mut dyn FnMut()) -> anyhow::Result<()>;
}

/// Bookkeeping shared between a render API family and its window APIs.
#[derive(Clone, Default)]
pub struct WindowApiTracker {
    next: Arc<AtomicU64>,
    live: Arc<Mutex<BTreeMap<WindowApiId, WindowApiInfo>>>,
}

impl WindowApiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id and records the window API as live.
    pub fn register(&self, size: PixelSize) -> WindowApiId {
        let id = WindowApiId(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.live().insert(
            id,
            WindowApiInfo {
                id,
                size,
                has_instance: false,
            },
        );
        id
    }

    pub fn update(&self, id: WindowApiId, size: PixelSize, has_instance: bool) {
        if let Some(info) = self.live().get_mut(&id) {
            info.size = size;
            info.has_instance = has_instance;
        }
    }

    pub fn remove(&self, id: WindowApiId) {
        self.live().remove(&id);
    }

    pub fn snapshot(&self) -> Vec<WindowApiInfo> {
        self.live().values().cloned().collect()
    }

    fn live(&self) -> std::sync::MutexGuard<'_, BTreeMap<WindowApiId, WindowApiInfo>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
