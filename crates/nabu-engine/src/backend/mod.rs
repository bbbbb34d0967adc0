//! Drawing backends and the registry that binds one per process.

mod contract;
mod registry;

pub use contract::{
    CanvasOps, ColorOps, DrawingBackend, FontId, FontOps, ImageId, ImageOps, Matrix, MatrixOps,
    PaintId, PaintOps, PathId, PathOps, PixelBuffer, PixelBufferOps, SurfaceId, SurfaceOps,
};
pub use registry::BackendRegistry;
