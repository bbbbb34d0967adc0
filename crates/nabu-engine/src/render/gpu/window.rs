use std::sync::Arc;

use anyhow::Context as _;

use crate::coords::PixelSize;
use crate::dispatch::GpuContext;
use crate::render::{
    EventHub, FramebufferResized, NativeContext, NativeTexture, Subscription, WindowApiId,
    WindowApiTracker, WindowRenderApi,
};

use super::surface::{self, SurfaceErrorAction};
use super::GpuShared;

/// OS surface the offscreen target is blitted to after each render callback.
struct Presenter {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// Native instance created by `create_instance`.
struct Bound {
    target: wgpu::Texture,
    presenter: Option<Presenter>,
    // Kept alive for the lifetime of the instance.
    _gpu_context: Option<Arc<dyn GpuContext>>,
}

/// Per-window wgpu render API.
pub struct WgpuWindowRenderApi {
    id: WindowApiId,
    gpu: Arc<GpuShared>,
    tracker: WindowApiTracker,
    size: PixelSize,
    bound: Option<Bound>,
    resized: EventHub<FramebufferResized>,
}

impl WgpuWindowRenderApi {
    pub(crate) fn new(gpu: Arc<GpuShared>, tracker: WindowApiTracker) -> Self {
        let size = PixelSize::default();
        Self {
            id: tracker.register(size),
            gpu,
            tracker,
            size,
            bound: None,
            resized: EventHub::new(),
        }
    }

    /// Format of the render target (matches the surface when there is one).
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.bound
            .as_ref()
            .and_then(|b| b.presenter.as_ref())
            .map(|p| p.config.format)
            .unwrap_or(self.gpu.init.offscreen_format)
    }

    fn create_presenter(&self, native: &NativeContext, size: PixelSize) -> anyhow::Result<Option<Presenter>> {
        let NativeContext::Surface(handle) = native else {
            return Ok(None);
        };

        let surface = self
            .gpu
            .instance
            .create_surface(handle.source())
            .context("failed to create wgpu surface")?;

        let caps = surface.get_capabilities(&self.gpu.adapter);
        let format = surface::choose_surface_format(&caps, self.gpu.init.prefer_srgb)
            .context("surface is not supported by the selected adapter")?;

        let config = wgpu::SurfaceConfiguration {
            usage: surface::choose_usage(&caps),
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: self.gpu.init.present_mode,
            alpha_mode: surface::choose_alpha_mode(&caps, self.gpu.init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.gpu.init.desired_maximum_frame_latency,
        };
        if !size.is_empty() {
            surface.configure(&self.gpu.device, &config);
        }

        Ok(Some(Presenter { surface, config }))
    }

    fn present(gpu: &GpuShared, size: PixelSize, target: &wgpu::Texture, presenter: &Presenter) -> anyhow::Result<()> {
        let frame = match presenter.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                let action = surface::map_surface_error(
                    &presenter.surface,
                    &gpu.device,
                    &presenter.config,
                    size,
                    err,
                );
                if action == SurfaceErrorAction::Fatal {
                    anyhow::bail!("surface lost beyond recovery");
                }
                log::debug!("skipping present: {action:?}");
                return Ok(());
            }
        };

        if presenter.config.usage.contains(wgpu::TextureUsages::COPY_DST) {
            let extent = wgpu::Extent3d {
                width: target.width().min(frame.texture.width()),
                height: target.height().min(frame.texture.height()),
                depth_or_array_layers: 1,
            };
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("nabu present blit"),
                });
            encoder.copy_texture_to_texture(target.as_image_copy(), frame.texture.as_image_copy(), extent);
            gpu.queue.submit(std::iter::once(encoder.finish()));
        }

        frame.present();
        Ok(())
    }
}

fn create_target(device: &wgpu::Device, size: PixelSize, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("nabu window target"),
        size: size.at_least_one().into(),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

impl WindowRenderApi for WgpuWindowRenderApi {
    fn id(&self) -> WindowApiId {
        self.id
    }

    fn create_instance(&mut self, native: NativeContext, size: PixelSize) -> anyhow::Result<()> {
        anyhow::ensure!(self.bound.is_none(), "window render API {:?} already has an instance", self.id);

        let presenter = self.create_presenter(&native, size)?;
        let format = presenter
            .as_ref()
            .map(|p| p.config.format)
            .unwrap_or(self.gpu.init.offscreen_format);
        let target = create_target(&self.gpu.device, size, format);

        log::debug!(
            "window render API {:?}: instance from {} at {size} ({format:?})",
            self.id,
            native.shape()
        );

        let gpu_context = match native {
            NativeContext::Gpu(ctx) => Some(ctx),
            _ => None,
        };

        self.size = size;
        self.bound = Some(Bound {
            target,
            presenter,
            _gpu_context: gpu_context,
        });
        self.tracker.update(self.id, size, true);
        Ok(())
    }

    fn destroy_instance(&mut self) {
        if let Some(bound) = self.bound.take() {
            bound.target.destroy();
            log::debug!("window render API {:?}: instance destroyed", self.id);
        }
        self.tracker.update(self.id, self.size, false);
    }

    fn has_instance(&self) -> bool {
        self.bound.is_some()
    }

    fn size(&self) -> PixelSize {
        self.size
    }

    fn resize(&mut self, size: PixelSize) -> anyhow::Result<()> {
        if size == self.size {
            return Ok(());
        }
        self.size = size;
        self.tracker.update(self.id, size, self.bound.is_some());

        let format = self.target_format();
        let Some(bound) = self.bound.as_mut() else {
            return Ok(());
        };

        if let Some(p) = bound.presenter.as_mut() {
            surface::apply_resize(&p.surface, &self.gpu.device, &mut p.config, size);
        }

        let old = std::mem::replace(&mut bound.target, create_target(&self.gpu.device, size, format));
        old.destroy();

        self.resized.emit(FramebufferResized { size });
        Ok(())
    }

    fn subscribe_resized(&self) -> Subscription<FramebufferResized> {
        self.resized.subscribe()
    }

    fn texture(&self) -> Option<NativeTexture> {
        self.bound
            .as_ref()
            .map(|b| NativeTexture::Wgpu(b.target.clone()))
    }

    fn render(&mut self, draw: &mut dyn FnMut()) -> anyhow::Result<()> {
        let bound = self
            .bound
            .as_ref()
            .context("render called before create_instance")?;

        draw();

        match &bound.presenter {
            Some(presenter) => Self::present(&self.gpu, self.size, &bound.target, presenter),
            None => Ok(()),
        }
    }
}

impl Drop for WgpuWindowRenderApi {
    fn drop(&mut self) {
        self.destroy_instance();
        self.tracker.remove(self.id);
    }
}
