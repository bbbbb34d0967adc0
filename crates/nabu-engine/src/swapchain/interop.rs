use crate::coords::PixelSize;
use crate::render::gpu::WgpuRenderApi;

use super::{HostCompositor, PresentFault, PresentHandle};

/// Receives finished frames from [`WgpuInterop`], e.g. to share them with a
/// platform compositor or read them back.
pub trait FrameSink: Send + Sync + 'static {
    fn present(&self, texture: &wgpu::Texture, size: PixelSize) -> anyhow::Result<()>;
}

/// Host compositor whose images are wgpu textures.
///
/// A present flushes the queue, hands the texture to the sink, and completes
/// once the GPU has finished all work submitted so far.
pub struct WgpuInterop<S: FrameSink> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    sink: S,
}

impl<S: FrameSink> WgpuInterop<S> {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat, sink: S) -> Self {
        Self {
            device,
            queue,
            format,
            sink,
        }
    }

    pub fn from_render_api(api: &WgpuRenderApi, sink: S) -> Self {
        Self::new(api.device().clone(), api.queue().clone(), api.offscreen_format(), sink)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: FrameSink> HostCompositor for WgpuInterop<S> {
    type Image = wgpu::Texture;

    fn create_image(&self, size: PixelSize) -> anyhow::Result<wgpu::Texture> {
        anyhow::ensure!(!size.is_empty(), "cannot allocate a {size} swapchain image");

        Ok(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nabu swapchain image"),
            size: size.into(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        }))
    }

    fn present(&self, image: &wgpu::Texture) -> PresentHandle {
        // Flush whatever the frame recorded before the sink sees the texture.
        self.queue.submit(std::iter::empty::<wgpu::CommandBuffer>());

        let size = PixelSize::new(image.width(), image.height());
        if let Err(e) = self.sink.present(image, size) {
            return PresentHandle::faulted(PresentFault::Rejected(format!("{e:#}")));
        }

        let (completer, handle) = PresentHandle::channel();
        self.queue.on_submitted_work_done(move || completer.complete());

        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll after present failed: {e}");
        }
        handle
    }

    fn dispose_image(&self, image: wgpu::Texture) {
        image.destroy();
    }
}
