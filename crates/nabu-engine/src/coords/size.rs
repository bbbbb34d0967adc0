use std::fmt;

/// Size of a framebuffer, texture or swapchain image in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area size cannot back a GPU texture.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clamps both dimensions to at least one pixel.
    #[inline]
    pub fn at_least_one(self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for PixelSize {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<PixelSize> for winit::dpi::PhysicalSize<u32> {
    fn from(size: PixelSize) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<PixelSize> for wgpu::Extent3d {
    fn from(size: PixelSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        }
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
