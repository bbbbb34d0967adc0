use std::any::Any;
use std::sync::Arc;

use anyhow::Context as _;

use crate::error::EngineError;
use crate::render::{RenderApi, RenderApiKind, WindowApiInfo, WindowApiTracker, WindowRenderApi};

use super::{WgpuInit, WgpuWindowRenderApi};

/// wgpu objects shared by a family and all of its window render APIs.
pub(crate) struct GpuShared {
    pub(crate) instance: wgpu::Instance,
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) init: WgpuInit,
}

/// Render API family backed by wgpu.
///
/// Each [`RenderApiKind`] is pinned to the matching wgpu backend, so a
/// `Vulkan` family never silently falls back to another driver.
pub struct WgpuRenderApi {
    kind: RenderApiKind,
    gpu: Arc<GpuShared>,
    tracker: WindowApiTracker,
}

impl WgpuRenderApi {
    /// Creates the instance, adapter and device for `kind`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(kind: RenderApiKind, init: WgpuInit) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        if kind == RenderApiKind::Web {
            return Err(EngineError::UnsupportedBackend {
                api: kind,
                by: "native wgpu",
            }
            .into());
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backends_for(kind),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("no {kind} adapter available"))?;

        let info = adapter.get_info();
        log::info!("{kind} adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("nabu-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            kind,
            gpu: Arc::new(GpuShared {
                instance,
                adapter,
                device,
                queue,
                init,
            }),
            tracker: WindowApiTracker::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.gpu.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.gpu.adapter.get_info()
    }

    /// Format of render targets not tied to a surface.
    pub fn offscreen_format(&self) -> wgpu::TextureFormat {
        self.gpu.init.offscreen_format
    }

    /// Software adapters (llvmpipe, WARP) report `Cpu`.
    pub fn is_hardware_accelerated(&self) -> bool {
        self.gpu.adapter.get_info().device_type != wgpu::DeviceType::Cpu
    }
}

impl RenderApi for WgpuRenderApi {
    fn kind(&self) -> RenderApiKind {
        self.kind
    }

    fn create_window_api(&self) -> anyhow::Result<Box<dyn WindowRenderApi>> {
        Ok(Box::new(WgpuWindowRenderApi::new(
            self.gpu.clone(),
            self.tracker.clone(),
        )))
    }

    fn window_apis(&self) -> Vec<WindowApiInfo> {
        self.tracker.snapshot()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn backends_for(kind: RenderApiKind) -> wgpu::Backends {
    match kind {
        RenderApiKind::OpenGl => wgpu::Backends::GL,
        RenderApiKind::Vulkan => wgpu::Backends::VULKAN,
        RenderApiKind::Web => wgpu::Backends::BROWSER_WEBGPU,
    }
}
