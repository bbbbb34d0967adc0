//! Offscreen swapchain demo: renders frames into pooled textures and hands
//! them to a sink that only logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use nabu_engine::coords::{Color, PixelSize};
use nabu_engine::render::gpu::WgpuRenderApi;
use nabu_engine::swapchain::{FrameSink, Swapchain, WgpuInterop};

#[derive(Default)]
pub struct LogSink {
    frames: AtomicUsize,
}

impl FrameSink for LogSink {
    fn present(&self, texture: &wgpu::Texture, size: PixelSize) -> anyhow::Result<()> {
        let frame = self.frames.fetch_add(1, Ordering::Relaxed);
        log::debug!("sink: frame {frame} at {size} ({:?})", texture.format());
        Ok(())
    }
}

fn fill(interop: &WgpuInterop<LogSink>, texture: &wgpu::Texture, color: Color) {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = interop
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("interop frame"),
        });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("interop frame"),
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
    interop.queue().submit(Some(encoder.finish()));
}

/// Draws `frames` frames, switching size halfway, then disposes the swapchain.
pub fn run(api: &WgpuRenderApi, frames: usize) -> anyhow::Result<()> {
    let swapchain = Swapchain::new(WgpuInterop::from_render_api(api, LogSink::default()));
    let sizes = [PixelSize::new(640, 360), PixelSize::new(1280, 720)];

    for frame in 0..frames {
        let size = sizes[usize::from(frame >= frames / 2)];
        let scope = swapchain.begin_draw(size)?;
        if let Some(texture) = scope.image() {
            let t = frame as f32 / frames.max(1) as f32;
            fill(swapchain.compositor(), texture, Color::new(t, 0.2, 1.0 - t, 1.0));
        }
        drop(scope);
        log::debug!("frame {frame}: {} images pooled", swapchain.pool_len());
    }

    // Present completions only fire while the device is polled.
    let stop = Arc::new(AtomicBool::new(false));
    let poller = {
        let device = api.device().clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                let _ = device.poll(wgpu::PollType::Poll);
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    let pooled = swapchain.pool_len();
    pollster::block_on(swapchain.dispose());
    stop.store(true, Ordering::Release);
    if poller.join().is_err() {
        log::warn!("device poller panicked");
    }

    log::info!(
        "interop: {frames} frames presented, {} sink frames, {pooled} images pooled at exit",
        swapchain.compositor().sink().frames.load(Ordering::Relaxed)
    );
    Ok(())
}
