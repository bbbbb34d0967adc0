//! Small wgpu drawing backend used by the studio.
//!
//! Clears go through a render pass; images and offscreen surfaces are plain
//! textures; paths are filled as their bounding box.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context as _, anyhow};
use futures::future::{BoxFuture, FutureExt};
use nabu_engine::backend::{
    CanvasOps, ColorOps, DrawingBackend, FontId, FontOps, ImageId, ImageOps, Matrix, MatrixOps,
    PaintId, PaintOps, PathId, PathOps, PixelBuffer, PixelBufferOps, SurfaceId, SurfaceOps,
};
use nabu_engine::coords::{Color, PixelSize};
use nabu_engine::dispatch::{Dispatcher, DispatcherExt};
use nabu_engine::render::gpu::WgpuRenderApi;
use nabu_engine::render::{RenderApi, RenderTarget};

const READBACK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
}

#[derive(Default)]
struct Resources {
    next_id: u64,
    images: HashMap<u64, wgpu::Texture>,
    surfaces: HashMap<u64, wgpu::Texture>,
    paints: HashMap<u64, Color>,
    paths: HashMap<u64, Vec<[f32; 2]>>,
    fonts: HashMap<u64, usize>,
}

impl Resources {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct DemoBackend {
    gpu: OnceLock<Gpu>,
    dispatcher: OnceLock<Arc<dyn Dispatcher>>,
    resources: Arc<Mutex<Resources>>,
    hardware: AtomicBool,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn gpu(&self) -> anyhow::Result<&Gpu> {
        self.gpu.get().context("demo backend used before setup")
    }

    fn resources(&self) -> MutexGuard<'_, Resources> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `work` where the GPU context is current.
    fn on_gpu<T, F>(&self, work: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let dispatcher = self.dispatcher.get().context("no dispatcher attached")?;
        dispatcher.invoke(work)?
    }

    fn create_texture(&self, size: PixelSize, label: &'static str) -> anyhow::Result<wgpu::Texture> {
        anyhow::ensure!(!size.is_empty(), "cannot create a {size} texture");
        let gpu = self.gpu()?;
        Ok(gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.into(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        }))
    }
}

fn target_texture(target: &RenderTarget) -> anyhow::Result<wgpu::Texture> {
    target
        .wgpu_texture()
        .cloned()
        .context("render target is not a wgpu texture")
}

/// Byte order of a 4-byte texel for `format`, or `None` if unsupported.
fn encode_texel(format: wgpu::TextureFormat, color: Color) -> Option<[u8; 4]> {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (r, g, b, a) = (q(color.r), q(color.g), q(color.b), q(color.a));
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => Some([r, g, b, a]),
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => Some([b, g, r, a]),
        _ => None,
    }
}

fn clear_texture(gpu: &Gpu, texture: &wgpu::Texture, color: Color) {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("studio clear"),
        });

    // Dropped before the encoder is finished.
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("studio clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.into()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    gpu.queue.submit(Some(encoder.finish()));
}

fn read_texture(gpu: &Gpu, texture: &wgpu::Texture) -> anyhow::Result<PixelBuffer> {
    let size = PixelSize::new(texture.width(), texture.height());
    let unpadded = size.width * 4;
    let stride = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("studio readback"),
        size: u64::from(stride) * u64::from(size.height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("studio readback"),
        });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(stride),
                rows_per_image: Some(size.height),
            },
        },
        size.into(),
    );
    gpu.queue.submit(Some(encoder.finish()));

    let (sender, receiver) = mpsc::channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let deadline = Instant::now() + READBACK_TIMEOUT;
    loop {
        let _ = gpu.device.poll(wgpu::PollType::Poll);
        match receiver.try_recv() {
            Ok(result) => {
                result.context("readback buffer mapping failed")?;
                break;
            }
            Err(mpsc::TryRecvError::Empty) if Instant::now() < deadline => std::thread::yield_now(),
            Err(mpsc::TryRecvError::Empty) => anyhow::bail!("readback timed out"),
            Err(mpsc::TryRecvError::Disconnected) => anyhow::bail!("readback was dropped"),
        }
    }

    let data = buffer.slice(..).get_mapped_range().to_vec();
    buffer.unmap();
    Ok(PixelBuffer { size, stride, data })
}

impl ColorOps for DemoBackend {
    fn to_native(&self, color: Color) -> u32 {
        color.to_argb32()
    }
}

impl ImageOps for DemoBackend {
    fn create_image(&self, size: PixelSize) -> anyhow::Result<ImageId> {
        let texture = self.create_texture(size, "studio image")?;
        let mut resources = self.resources();
        let id = resources.next();
        resources.images.insert(id, texture);
        Ok(ImageId(id))
    }

    fn image_size(&self, image: ImageId) -> Option<PixelSize> {
        self.resources()
            .images
            .get(&image.0)
            .map(|t| PixelSize::new(t.width(), t.height()))
    }

    fn release_image(&self, image: ImageId) {
        if let Some(texture) = self.resources().images.remove(&image.0) {
            texture.destroy();
        }
    }
}

impl CanvasOps for DemoBackend {
    fn clear(&self, target: &RenderTarget, color: Color) -> anyhow::Result<()> {
        let texture = target_texture(target)?;
        let gpu = self.gpu()?.clone();
        self.on_gpu(move || {
            clear_texture(&gpu, &texture, color);
            Ok(())
        })
    }

    /// Blits `image` at the transform's translation. Only pure translations
    /// are supported.
    fn draw_image(&self, target: &RenderTarget, image: ImageId, transform: Matrix) -> anyhow::Result<()> {
        anyhow::ensure!(
            transform[..4] == [1.0, 0.0, 0.0, 1.0],
            "demo backend only draws translated images"
        );
        let dst = target_texture(target)?;
        let src = self
            .resources()
            .images
            .get(&image.0)
            .cloned()
            .with_context(|| format!("unknown image {image:?}"))?;
        anyhow::ensure!(
            src.format().remove_srgb_suffix() == dst.format().remove_srgb_suffix(),
            "image format {:?} does not match target {:?}",
            src.format(),
            dst.format()
        );

        let (x, y) = (transform[4].max(0.0) as u32, transform[5].max(0.0) as u32);
        if x >= dst.width() || y >= dst.height() {
            return Ok(());
        }
        let extent = wgpu::Extent3d {
            width: src.width().min(dst.width() - x),
            height: src.height().min(dst.height() - y),
            depth_or_array_layers: 1,
        };

        let gpu = self.gpu()?.clone();
        self.on_gpu(move || {
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("studio draw image"),
                });
            encoder.copy_texture_to_texture(
                src.as_image_copy(),
                wgpu::TexelCopyTextureInfo {
                    texture: &dst,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x, y, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                extent,
            );
            gpu.queue.submit(Some(encoder.finish()));
            Ok(())
        })
    }

    fn draw_path(&self, target: &RenderTarget, path: PathId, paint: PaintId) -> anyhow::Result<()> {
        let (points, color) = {
            let resources = self.resources();
            let points = resources
                .paths
                .get(&path.0)
                .cloned()
                .with_context(|| format!("unknown path {path:?}"))?;
            let color = *resources
                .paints
                .get(&paint.0)
                .with_context(|| format!("unknown paint {paint:?}"))?;
            (points, color)
        };
        let texture = target_texture(target)?;
        let texel = encode_texel(texture.format(), color)
            .with_context(|| format!("cannot fill {:?} targets", texture.format()))?;

        let bounds = points.iter().fold(None, |acc: Option<[f32; 4]>, [x, y]| {
            Some(match acc {
                None => [*x, *y, *x, *y],
                Some([x0, y0, x1, y1]) => [x0.min(*x), y0.min(*y), x1.max(*x), y1.max(*y)],
            })
        });
        let Some([x0, y0, x1, y1]) = bounds else {
            return Ok(());
        };

        let clamp_x = |v: f32| (v.max(0.0) as u32).min(texture.width());
        let clamp_y = |v: f32| (v.max(0.0) as u32).min(texture.height());
        let (left, top, right, bottom) = (clamp_x(x0), clamp_y(y0), clamp_x(x1.ceil()), clamp_y(y1.ceil()));
        if right <= left || bottom <= top {
            return Ok(());
        }
        let (width, height) = (right - left, bottom - top);
        let data = texel.repeat((width * height) as usize);

        let gpu = self.gpu()?.clone();
        self.on_gpu(move || {
            gpu.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: left, y: top, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                &data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            Ok(())
        })
    }
}

impl PaintOps for DemoBackend {
    fn create_solid(&self, color: Color) -> PaintId {
        let mut resources = self.resources();
        let id = resources.next();
        resources.paints.insert(id, color);
        PaintId(id)
    }

    fn release_paint(&self, paint: PaintId) {
        self.resources().paints.remove(&paint.0);
    }
}

impl PathOps for DemoBackend {
    fn create_path(&self) -> PathId {
        let mut resources = self.resources();
        let id = resources.next();
        resources.paths.insert(id, Vec::new());
        PathId(id)
    }

    fn move_to(&self, path: PathId, x: f32, y: f32) {
        if let Some(points) = self.resources().paths.get_mut(&path.0) {
            points.push([x, y]);
        }
    }

    fn line_to(&self, path: PathId, x: f32, y: f32) {
        self.move_to(path, x, y);
    }

    fn close(&self, _path: PathId) {}

    fn release_path(&self, path: PathId) {
        self.resources().paths.remove(&path.0);
    }
}

impl MatrixOps for DemoBackend {}

impl PixelBufferOps for DemoBackend {
    fn read_pixels(&self, target: &RenderTarget) -> anyhow::Result<PixelBuffer> {
        let texture = target_texture(target)?;
        let gpu = self.gpu()?.clone();
        self.on_gpu(move || read_texture(&gpu, &texture))
    }
}

impl SurfaceOps for DemoBackend {
    fn create_surface(&self, size: PixelSize) -> anyhow::Result<SurfaceId> {
        let texture = self.create_texture(size, "studio surface")?;
        let mut resources = self.resources();
        let id = resources.next();
        resources.surfaces.insert(id, texture);
        Ok(SurfaceId(id))
    }

    fn release_surface(&self, surface: SurfaceId) {
        if let Some(texture) = self.resources().surfaces.remove(&surface.0) {
            texture.destroy();
        }
    }
}

impl FontOps for DemoBackend {
    /// Accepts TrueType, OpenType and collection files. Glyphs are not
    /// rasterized; the face is only tracked.
    fn load_font(&self, bytes: &[u8]) -> anyhow::Result<FontId> {
        let magic = bytes.get(..4).context("font data is truncated")?;
        anyhow::ensure!(
            matches!(magic, &[0, 1, 0, 0] | b"OTTO" | b"true" | b"ttcf"),
            "not a TrueType/OpenType font"
        );
        let mut resources = self.resources();
        let id = resources.next();
        resources.fonts.insert(id, bytes.len());
        Ok(FontId(id))
    }

    fn release_font(&self, font: FontId) {
        self.resources().fonts.remove(&font.0);
    }
}

impl DrawingBackend for DemoBackend {
    fn name(&self) -> &str {
        "studio-demo"
    }

    fn setup(&self, render_api: &dyn RenderApi) -> anyhow::Result<()> {
        let api = render_api
            .as_any()
            .downcast_ref::<WgpuRenderApi>()
            .context("the demo backend needs a wgpu render API")?;

        self.gpu
            .set(Gpu {
                device: api.device().clone(),
                queue: api.queue().clone(),
                format: api.offscreen_format(),
            })
            .map_err(|_| anyhow!("demo backend is already set up"))?;
        self.hardware.store(api.is_hardware_accelerated(), Ordering::Release);

        let info = api.adapter_info();
        log::info!("demo backend on {} ({:?})", info.name, info.device_type);
        Ok(())
    }

    fn is_hardware_accelerated(&self) -> bool {
        self.hardware.load(Ordering::Acquire)
    }

    fn attach_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        if self.dispatcher.set(dispatcher).is_err() {
            log::warn!("demo backend already has a dispatcher");
        }
    }

    fn dispose(&self) -> BoxFuture<'static, ()> {
        let resources = self.resources.clone();
        async move {
            let mut guard = resources.lock().unwrap_or_else(PoisonError::into_inner);
            let resources = &mut *guard;
            let textures = resources.images.len() + resources.surfaces.len();
            for (_, texture) in resources.images.drain().chain(resources.surfaces.drain()) {
                texture.destroy();
            }
            resources.paints.clear();
            resources.paths.clear();
            resources.fonts.clear();
            log::debug!("demo backend released {textures} textures");
        }
        .boxed()
    }

    fn color(&self) -> &dyn ColorOps {
        self
    }
    fn image(&self) -> &dyn ImageOps {
        self
    }
    fn canvas(&self) -> &dyn CanvasOps {
        self
    }
    fn paint(&self) -> &dyn PaintOps {
        self
    }
    fn path(&self) -> &dyn PathOps {
        self
    }
    fn matrix(&self) -> &dyn MatrixOps {
        self
    }
    fn pixel_buffer(&self) -> &dyn PixelBufferOps {
        self
    }
    fn surface(&self) -> &dyn SurfaceOps {
        self
    }
    fn font(&self) -> &dyn FontOps {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texels_follow_channel_order() {
        let red = Color::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(encode_texel(wgpu::TextureFormat::Rgba8Unorm, red), Some([255, 0, 0, 255]));
        assert_eq!(encode_texel(wgpu::TextureFormat::Bgra8UnormSrgb, red), Some([0, 0, 255, 255]));
        assert_eq!(encode_texel(wgpu::TextureFormat::R8Unorm, red), None);
    }

    #[test]
    fn fonts_are_checked_by_magic() {
        let backend = DemoBackend::new();
        assert!(backend.load_font(b"OTTO\0\0").is_ok());
        assert!(backend.load_font(&[0, 1, 0, 0, 9]).is_ok());
        assert!(backend.load_font(b"GIF89a").is_err());
        assert!(backend.load_font(b"ab").is_err());
    }

    #[test]
    fn gpu_ops_fail_before_setup() {
        let backend = DemoBackend::new();
        assert!(backend.create_image(PixelSize::new(4, 4)).is_err());
        assert_eq!(backend.image_size(ImageId(1)), None);
    }

    #[test]
    fn paths_collect_points() {
        let backend = DemoBackend::new();
        let path = backend.create_path();
        backend.move_to(path, 1.0, 2.0);
        backend.line_to(path, 3.0, 4.0);
        assert_eq!(backend.resources().paths[&path.0], vec![[1.0, 2.0], [3.0, 4.0]]);
        backend.release_path(path);
        assert!(backend.resources().paths.is_empty());
    }
}
