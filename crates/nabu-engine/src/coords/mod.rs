//! Pixel-space value types shared by render targets, windows and swapchains.

mod color;
mod size;

pub use color::Color;
pub use size::PixelSize;
