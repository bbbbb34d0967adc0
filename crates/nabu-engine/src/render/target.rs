use crate::coords::PixelSize;

/// Backend-native handle of a render-target texture.
#[derive(Debug, Clone)]
pub enum NativeTexture {
    Gl { id: u32 },
    Vulkan { image: u64 },
    Web { id: u64 },
    Wgpu(wgpu::Texture),
}

/// Drawable wrapper around a window's current native texture.
///
/// Rebuilt whenever the framebuffer changes size; `generation` increases with
/// every rebuild, so stale targets are easy to spot.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    texture: NativeTexture,
    size: PixelSize,
    generation: u64,
}

impl RenderTarget {
    pub fn new(texture: NativeTexture, size: PixelSize, generation: u64) -> Self {
        Self {
            texture,
            size,
            generation,
        }
    }

    pub fn texture(&self) -> &NativeTexture {
        &self.texture
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn wgpu_texture(&self) -> Option<&wgpu::Texture> {
        match &self.texture {
            NativeTexture::Wgpu(texture) => Some(texture),
            _ => None,
        }
    }
}
