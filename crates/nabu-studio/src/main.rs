mod app;
mod backend;
mod interop;

use std::sync::Arc;

use anyhow::Context as _;
use nabu_engine::backend::BackendRegistry;
use nabu_engine::dispatch::InlineDispatcher;
use nabu_engine::logging::{LoggingConfig, init_logging};
use nabu_engine::render::RenderApiKind;
use nabu_engine::render::gpu::{WgpuInit, WgpuRenderApi};
use nabu_engine::window::WinitPlatform;
use nabu_engine::{DrawingEngine, EngineConfiguration, EngineSettings};

use crate::app::StudioApp;
use crate::backend::DemoBackend;

const INTEROP_FRAMES: usize = 12;

fn render_api_kind() -> anyhow::Result<RenderApiKind> {
    match std::env::var("NABU_RENDER_API") {
        Ok(name) => name.parse(),
        Err(_) => Ok(RenderApiKind::Vulkan),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_filter("info,wgpu_core=warn,wgpu_hal=warn"));

    let kind = render_api_kind()?;
    let api = pollster::block_on(WgpuRenderApi::new(kind, WgpuInit::default()))
        .with_context(|| format!("failed to bring up the {kind} render API"))?;

    if std::env::args().any(|arg| arg == "--interop") {
        return interop::run(&api, INTEROP_FRAMES);
    }

    let backend = Arc::new(DemoBackend::new());
    let config = EngineConfiguration {
        render_api: Arc::new(api),
        platform: Box::new(WinitPlatform::new()?),
        backend: backend.clone(),
        dispatcher: Arc::new(InlineDispatcher::new()),
        settings: EngineSettings::default()
            .with_title("Nabu Studio")
            .with_render_api(kind),
    };

    let mut engine = DrawingEngine::new(Arc::new(BackendRegistry::new()), config)?;
    let outcome = engine.run_with_app(&mut StudioApp::new(backend));
    pollster::block_on(engine.dispose());
    outcome?;
    Ok(())
}
