use std::fmt;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::dispatch::GpuContext;

/// Anything a GPU surface can be created from.
pub trait SurfaceSource: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T> SurfaceSource for T where T: HasWindowHandle + HasDisplayHandle + Send + Sync + ?Sized {}

/// Shared OS surface handle, e.g. a winit window.
#[derive(Clone)]
pub struct SurfaceHandle {
    source: Arc<dyn SurfaceSource>,
}

impl SurfaceHandle {
    pub fn new(source: Arc<dyn SurfaceSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Arc<dyn SurfaceSource> {
        self.source.clone()
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHandle").finish_non_exhaustive()
    }
}

/// Plain platform identity of a native window.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NativeHandle {
    /// OS window id as reported by the windowing platform.
    Window { id: u64 },
    /// In-process window with no OS counterpart.
    Headless { id: u64 },
}

/// Native context handed to [`WindowRenderApi::create_instance`](super::WindowRenderApi::create_instance).
///
/// Its shape depends on the render API family:
/// OpenGL needs a GPU context, Vulkan an OS surface, Web a plain handle.
#[derive(Clone)]
pub enum NativeContext {
    Gpu(Arc<dyn GpuContext>),
    Surface(SurfaceHandle),
    Native(NativeHandle),
}

impl NativeContext {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Gpu(_) => "gpu-context",
            Self::Surface(_) => "surface",
            Self::Native(_) => "native-handle",
        }
    }
}

impl fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(handle) => f.debug_tuple("Native").field(handle).finish(),
            other => f.write_str(other.shape()),
        }
    }
}
