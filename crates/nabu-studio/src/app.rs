use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use nabu_engine::coords::Color;
use nabu_engine::input::{Key, NamedKey};
use nabu_engine::window::Window;
use nabu_engine::{Application, DrawingBackend, EngineInfo};

/// Animated clear color; Escape closes the window.
pub struct StudioApp {
    backend: Arc<dyn DrawingBackend>,
}

impl StudioApp {
    pub fn new(backend: Arc<dyn DrawingBackend>) -> Self {
        Self { backend }
    }
}

fn color_at(seconds: f32) -> Color {
    let wave = |phase: f32| 0.5 + 0.5 * (seconds * 0.6 + phase).sin();
    Color::new(wave(0.0) * 0.3, wave(2.1) * 0.3, wave(4.2) * 0.5, 1.0)
}

impl Application for StudioApp {
    fn initialize(&mut self, engine: &EngineInfo) -> anyhow::Result<()> {
        log::info!(
            "studio on {} via {} (backend `{}`)",
            engine.render_api,
            engine.platform,
            engine.backend
        );
        Ok(())
    }

    fn run(&mut self, window: &mut Window) -> anyhow::Result<()> {
        let elapsed = Rc::new(Cell::new(0.0_f32));

        let clock = elapsed.clone();
        window.on_update(move |ctx| {
            if ctx.input.key_pressed(Key::Named(NamedKey::Escape)) {
                log::info!("escape pressed, closing");
                ctx.request_close();
            }
            clock.set(ctx.time.elapsed);
        });

        let backend = self.backend.clone();
        window.on_render(move |target| {
            if let Err(e) = backend.canvas().clear(target, color_at(elapsed.get())) {
                log::error!("clear failed: {e:#}");
            }
        });

        log::info!("backend hardware accelerated: {}", self.backend.is_hardware_accelerated());
        Ok(())
    }
}
