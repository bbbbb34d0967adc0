use std::sync::Arc;

use futures::future::BoxFuture;

use crate::coords::{Color, PixelSize};
use crate::dispatch::Dispatcher;
use crate::render::{RenderApi, RenderTarget};

macro_rules! handle_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub u64);
    )*};
}

handle_id! {
    /// Backend-owned image.
    ImageId,
    /// Backend-owned path geometry.
    PathId,
    /// Backend-owned paint (fill/stroke description).
    PaintId,
    /// Backend-owned font face.
    FontId,
    /// Backend-owned offscreen drawing surface.
    SurfaceId,
}

/// Row-major 2D affine transform `[a, b, c, d, tx, ty]`.
pub type Matrix = [f32; 6];

/// Pixels read back from a render target.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PixelBuffer {
    pub size: PixelSize,
    /// Bytes per row, including padding.
    pub stride: u32,
    pub data: Vec<u8>,
}

pub trait ColorOps: Send + Sync {
    /// Packs a color into the backend's native 32-bit pixel layout.
    fn to_native(&self, color: Color) -> u32;
}

pub trait ImageOps: Send + Sync {
    fn create_image(&self, size: PixelSize) -> anyhow::Result<ImageId>;
    fn image_size(&self, image: ImageId) -> Option<PixelSize>;
    fn release_image(&self, image: ImageId);
}

pub trait CanvasOps: Send + Sync {
    fn clear(&self, target: &RenderTarget, color: Color) -> anyhow::Result<()>;
    fn draw_image(&self, target: &RenderTarget, image: ImageId, transform: Matrix) -> anyhow::Result<()>;
    fn draw_path(&self, target: &RenderTarget, path: PathId, paint: PaintId) -> anyhow::Result<()>;
}

pub trait PaintOps: Send + Sync {
    fn create_solid(&self, color: Color) -> PaintId;
    fn release_paint(&self, paint: PaintId);
}

pub trait PathOps: Send + Sync {
    fn create_path(&self) -> PathId;
    fn move_to(&self, path: PathId, x: f32, y: f32);
    fn line_to(&self, path: PathId, x: f32, y: f32);
    fn close(&self, path: PathId);
    fn release_path(&self, path: PathId);
}

/// Affine math. The provided methods are plain CPU math; backends with native
/// matrix types may override them.
pub trait MatrixOps: Send + Sync {
    fn identity(&self) -> Matrix {
        [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    }

    /// `a` then `b`.
    fn multiply(&self, a: Matrix, b: Matrix) -> Matrix {
        [
            a[0] * b[0] + a[1] * b[2],
            a[0] * b[1] + a[1] * b[3],
            a[2] * b[0] + a[3] * b[2],
            a[2] * b[1] + a[3] * b[3],
            a[4] * b[0] + a[5] * b[2] + b[4],
            a[4] * b[1] + a[5] * b[3] + b[5],
        ]
    }

    fn invert(&self, m: Matrix) -> Option<Matrix> {
        let det = m[0] * m[3] - m[1] * m[2];
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        let (a, b, c, d) = (m[3] * inv, -m[1] * inv, -m[2] * inv, m[0] * inv);
        Some([a, b, c, d, -(m[4] * a + m[5] * c), -(m[4] * b + m[5] * d)])
    }
}

pub trait PixelBufferOps: Send + Sync {
    fn read_pixels(&self, target: &RenderTarget) -> anyhow::Result<PixelBuffer>;
}

pub trait SurfaceOps: Send + Sync {
    fn create_surface(&self, size: PixelSize) -> anyhow::Result<SurfaceId>;
    fn release_surface(&self, surface: SurfaceId);
}

pub trait FontOps: Send + Sync {
    fn load_font(&self, bytes: &[u8]) -> anyhow::Result<FontId>;
    fn release_font(&self, font: FontId);
}

/// Concrete implementation of the drawing primitives, bound once per process.
///
/// The engine never draws itself; it only routes callers to the backend's
/// capability sets below.
pub trait DrawingBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Backend-specific GPU setup against the active render API.
    ///
    /// Called on the dispatch thread with the GPU context current.
    fn setup(&self, render_api: &dyn RenderApi) -> anyhow::Result<()>;

    fn is_hardware_accelerated(&self) -> bool;

    /// Hands the backend the dispatcher its GPU work must go through.
    fn attach_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>);

    /// Releases every GPU resource the backend owns.
    fn dispose(&self) -> BoxFuture<'static, ()>;

    fn color(&self) -> &dyn ColorOps;
    fn image(&self) -> &dyn ImageOps;
    fn canvas(&self) -> &dyn CanvasOps;
    fn paint(&self) -> &dyn PaintOps;
    fn path(&self) -> &dyn PathOps;
    fn matrix(&self) -> &dyn MatrixOps;
    fn pixel_buffer(&self) -> &dyn PixelBufferOps;
    fn surface(&self) -> &dyn SurfaceOps;
    fn font(&self) -> &dyn FontOps;
}
