use std::sync::Arc;

use crate::coords::PixelSize;
use crate::error::{EngineError, Result};
use crate::input::InputController;
use crate::render::{
    FramebufferResized, NativeContext, RenderApi, RenderApiKind, RenderTarget, Subscription,
    WindowRenderApi,
};
use crate::time::{TickClock, TickTime};

use super::{HostEvent, LoopControl, NativeWindow, WindowRoster, WindowSettings};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowState {
    Created,
    Initialized,
    /// Host loop running.
    Running,
    /// Terminal.
    Closed,
}

/// Context passed to update callbacks.
pub struct UpdateCtx<'a> {
    pub time: TickTime,
    pub input: &'a InputController,
    pub size: PixelSize,
    close: bool,
}

impl UpdateCtx<'_> {
    /// Ends the host loop after this tick's update; nothing is rendered.
    pub fn request_close(&mut self) {
        self.close = true;
    }
}

pub type UpdateCallback = Box<dyn FnMut(&mut UpdateCtx<'_>)>;
pub type RenderCallback = Box<dyn FnMut(&RenderTarget)>;

/// A top-level window and the render API instance drawing into it.
///
/// `Created → Initialized → Running → Closed`. Each tick first drops a stale
/// render target, then runs update callbacks, then render callbacks.
pub struct Window {
    id: u64,
    title: String,
    state: WindowState,
    native: Option<Box<dyn NativeWindow>>,
    render_api: Arc<dyn RenderApi>,
    window_api: Option<Box<dyn WindowRenderApi>>,
    input: Option<InputController>,
    target: Option<RenderTarget>,
    resized: Option<Subscription<FramebufferResized>>,
    update_callbacks: Vec<UpdateCallback>,
    render_callbacks: Vec<RenderCallback>,
    size: PixelSize,
    visible: bool,
    show_on_top: bool,
    clock: TickClock,
    generation: u64,
    fault: Option<EngineError>,
    roster: WindowRoster,
}

impl Window {
    pub fn new(
        native: Box<dyn NativeWindow>,
        render_api: Arc<dyn RenderApi>,
        settings: &WindowSettings,
        roster: WindowRoster,
    ) -> Self {
        let id = native.id();
        roster.insert(id);
        Self {
            id,
            title: settings.title.clone(),
            state: WindowState::Created,
            size: native.size(),
            native: Some(native),
            render_api,
            window_api: None,
            input: None,
            target: None,
            resized: None,
            update_callbacks: Vec::new(),
            render_callbacks: Vec::new(),
            visible: false,
            show_on_top: settings.show_on_top,
            clock: TickClock::new(),
            generation: 0,
            fault: None,
            roster,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_shown_on_top(&self) -> bool {
        self.show_on_top
    }

    pub fn input(&self) -> Option<&InputController> {
        self.input.as_ref()
    }

    /// Current render target; `None` until shown.
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    pub fn window_api(&self) -> Option<&dyn WindowRenderApi> {
        self.window_api.as_deref()
    }

    pub fn on_update(&mut self, callback: impl FnMut(&mut UpdateCtx<'_>) + 'static) {
        self.update_callbacks.push(Box::new(callback));
    }

    pub fn on_render(&mut self, callback: impl FnMut(&RenderTarget) + 'static) {
        self.render_callbacks.push(Box::new(callback));
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(native) = self.native.as_mut() {
            native.set_visible(visible);
        }
    }

    pub fn set_show_on_top(&mut self, on_top: bool) {
        self.show_on_top = on_top;
        if let Some(native) = self.native.as_mut() {
            native.set_topmost(on_top);
        }
    }

    /// Creates the window render API instance and the input controller.
    ///
    /// Idempotent: later calls leave the existing instance alone.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            WindowState::Created => {}
            WindowState::Initialized | WindowState::Running => return Ok(()),
            WindowState::Closed => return Err(EngineError::InvalidState("window is closed")),
        }

        let native = self
            .native
            .as_ref()
            .ok_or(EngineError::InvalidState("native window missing"))?;

        let kind = self.render_api.kind();
        let context = match kind {
            RenderApiKind::OpenGl => NativeContext::Gpu(native.gpu_context()?),
            RenderApiKind::Vulkan => NativeContext::Surface(native.surface_handle()?),
            RenderApiKind::Web => NativeContext::Native(native.native_handle()),
        };

        let mut api = self.render_api.create_window_api()?;
        api.create_instance(context, self.size)?;

        self.window_api = Some(api);
        self.input = Some(InputController::new());
        self.state = WindowState::Initialized;
        log::info!("window {} initialized for {kind} at {}", self.id, self.size);
        Ok(())
    }

    /// Makes the window visible and runs its host loop until it closes.
    ///
    /// Initializes first if needed. Calling it while the loop is already
    /// running returns immediately. The window is closed when the loop ends.
    pub fn show(&mut self) -> Result<()> {
        match self.state {
            WindowState::Running => return Ok(()),
            WindowState::Closed => return Err(EngineError::InvalidState("window is closed")),
            WindowState::Created => self.initialize()?,
            WindowState::Initialized => {}
        }

        let api = self
            .window_api
            .as_ref()
            .ok_or(EngineError::NotInitialized { what: "window render API" })?;
        self.resized = Some(api.subscribe_resized());
        self.rebuild_target();

        let mut native = self
            .native
            .take()
            .ok_or(EngineError::InvalidState("native window missing"))?;
        native.set_topmost(self.show_on_top);
        native.set_visible(true);
        self.visible = true;

        self.state = WindowState::Running;
        self.clock.reset();
        log::debug!("window {} entering host loop", self.id);

        let outcome = native.run(&mut |event| self.handle(event));
        self.native = Some(native);

        let fault = self.fault.take();
        self.close();

        outcome?;
        fault.map_or(Ok(()), Err)
    }

    /// Unsubscribes callbacks, drops the render target, destroys the render API
    /// instance, then disposes the native window. Idempotent.
    pub fn close(&mut self) {
        if self.state == WindowState::Closed {
            return;
        }

        self.update_callbacks.clear();
        self.render_callbacks.clear();
        self.resized = None;
        self.target = None;

        if let Some(mut api) = self.window_api.take() {
            api.destroy_instance();
        }
        if let Some(mut native) = self.native.take() {
            native.dispose();
        }

        self.input = None;
        self.visible = false;
        self.roster.remove(self.id);
        self.state = WindowState::Closed;
        log::info!("window {} closed", self.id);
    }

    fn handle(&mut self, event: HostEvent) -> LoopControl {
        match event {
            HostEvent::Tick => self.tick(),
            HostEvent::Resized(size) => {
                self.size = size;
                if let Some(api) = self.window_api.as_mut() {
                    if let Err(e) = api.resize(size) {
                        return self.fail(e.into());
                    }
                }
                LoopControl::Continue
            }
            HostEvent::Input(input) => {
                if let Some(controller) = self.input.as_mut() {
                    controller.apply(input);
                }
                LoopControl::Continue
            }
            HostEvent::CloseRequested => LoopControl::Exit,
        }
    }

    fn tick(&mut self) -> LoopControl {
        let resized = self.resized.as_ref().and_then(Subscription::latest);
        let api_size = self.window_api.as_ref().map(|api| api.size());
        let stale = self.target.as_ref().map(RenderTarget::size) != api_size;
        if resized.is_some() || stale {
            self.rebuild_target();
        }

        let Some(input) = self.input.as_ref() else {
            return LoopControl::Exit;
        };
        let mut ctx = UpdateCtx {
            time: self.clock.tick(),
            input,
            size: self.size,
            close: false,
        };
        for callback in &mut self.update_callbacks {
            callback(&mut ctx);
        }
        if ctx.close {
            return LoopControl::Exit;
        }

        if let (Some(api), Some(target)) = (self.window_api.as_mut(), self.target.as_ref()) {
            let callbacks = &mut self.render_callbacks;
            let rendered = api.render(&mut || {
                for callback in callbacks.iter_mut() {
                    callback(target);
                }
            });
            if let Err(e) = rendered {
                return self.fail(e.into());
            }
        }

        if let Some(input) = self.input.as_mut() {
            input.end_tick();
        }
        LoopControl::Continue
    }

    fn rebuild_target(&mut self) {
        self.target = None;
        let Some(api) = self.window_api.as_ref() else {
            return;
        };
        if let Some(texture) = api.texture() {
            self.generation += 1;
            self.target = Some(RenderTarget::new(texture, api.size(), self.generation));
            log::debug!("window {}: render target #{} at {}", self.id, self.generation, api.size());
        }
    }

    fn fail(&mut self, error: EngineError) -> LoopControl {
        log::error!("window {} loop failed: {error}", self.id);
        self.fault = Some(error);
        LoopControl::Exit
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NativeTexture;
    use crate::testing::{FakeRenderApi, LoggingNative, OrderLog};
    use crate::window::{HeadlessPlatform, WindowFactory, WindowingPlatform};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::Ordering;

    const INITIAL: PixelSize = PixelSize::new(800, 600);

    fn headless_window(kind: RenderApiKind) -> (HeadlessPlatform, Arc<FakeRenderApi>, Window) {
        let mut platform = HeadlessPlatform::new();
        let api = FakeRenderApi::new(kind);
        let window = WindowFactory::new(&mut platform, api.clone(), WindowRoster::new())
            .create(&WindowSettings::new("test", INITIAL))
            .unwrap();
        (platform, api, window)
    }

    // ── initialize ───────────────────────────────────────────────────────

    #[test]
    fn initialize_twice_creates_one_instance() {
        let (_platform, api, mut window) = headless_window(RenderApiKind::Web);
        window.initialize().unwrap();
        window.initialize().unwrap();

        assert_eq!(window.state(), WindowState::Initialized);
        assert_eq!(api.stats.window_apis_created.load(Ordering::SeqCst), 1);
        assert_eq!(api.stats.instances_created.load(Ordering::SeqCst), 1);
        assert!(window.input().is_some());
    }

    #[test]
    fn each_family_gets_its_native_context_shape() {
        for (kind, shape) in [
            (RenderApiKind::OpenGl, "gpu-context"),
            (RenderApiKind::Web, "native-handle"),
        ] {
            let (_platform, api, mut window) = headless_window(kind);
            window.initialize().unwrap();
            assert_eq!(api.stats.shapes(), vec![shape]);
        }
    }

    #[test]
    fn vulkan_gets_the_native_surface() {
        let api = FakeRenderApi::new(RenderApiKind::Vulkan);
        let native = LoggingNative::new(3, INITIAL, OrderLog::default()).with_surface();
        let mut window = Window::new(
            Box::new(native),
            api.clone(),
            &WindowSettings::default(),
            WindowRoster::new(),
        );
        window.initialize().unwrap();

        assert_eq!(api.stats.shapes(), vec!["surface"]);
        assert_eq!(window.state(), WindowState::Initialized);
        assert_eq!(api.stats.instances_created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn headless_platform_has_no_surface_for_vulkan() {
        let (_platform, api, mut window) = headless_window(RenderApiKind::Vulkan);
        let err = window.initialize().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedBackend { api: RenderApiKind::Vulkan, .. }));
        assert_eq!(window.state(), WindowState::Created);
        assert_eq!(api.stats.instances_created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn instance_failure_propagates() {
        let (_platform, api, mut window) = headless_window(RenderApiKind::Web);
        api.stats.fail_instance.store(true, Ordering::SeqCst);
        assert!(matches!(window.initialize(), Err(EngineError::Host(_))));
        assert_eq!(window.state(), WindowState::Created);
    }

    // ── show ─────────────────────────────────────────────────────────────

    #[test]
    fn show_initializes_and_runs_update_then_render() {
        let (platform, api, mut window) = headless_window(RenderApiKind::Web);
        platform.driver_for(window.id()).unwrap().tick(3);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        window.on_update(move |ctx| o.borrow_mut().push(format!("update {}", ctx.time.tick)));
        let o = order.clone();
        window.on_render(move |_| o.borrow_mut().push("render".to_owned()));

        window.show().unwrap();

        assert_eq!(
            *order.borrow(),
            vec!["update 0", "render", "update 1", "render", "update 2", "render"]
        );
        assert_eq!(api.stats.renders.load(Ordering::SeqCst), 3);
        assert_eq!(window.state(), WindowState::Closed);
    }

    #[test]
    fn show_makes_window_visible_and_applies_topmost() {
        let mut platform = HeadlessPlatform::new();
        let api = FakeRenderApi::new(RenderApiKind::Web);
        let mut settings = WindowSettings::new("top", INITIAL);
        settings.show_on_top = true;
        let mut window = WindowFactory::new(&mut platform, api, WindowRoster::new())
            .create(&settings)
            .unwrap();
        let driver = platform.driver_for(window.id()).unwrap();

        let seen = driver.clone();
        let visible_during_loop = Rc::new(RefCell::new(false));
        let v = visible_during_loop.clone();
        window.on_update(move |_| *v.borrow_mut() = seen.is_visible() && seen.is_topmost());
        driver.tick(1);

        window.show().unwrap();
        assert!(*visible_during_loop.borrow());
        assert!(driver.is_disposed());
    }

    #[test]
    fn update_can_request_close() {
        let (platform, api, mut window) = headless_window(RenderApiKind::Web);
        platform.driver_for(window.id()).unwrap().tick(10);
        window.on_update(|ctx| {
            if ctx.time.tick == 1 {
                ctx.request_close();
            }
        });
        window.show().unwrap();
        assert_eq!(api.stats.renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn input_reaches_controller_before_update() {
        use crate::input::{ButtonState, InputEvent, Key, NamedKey};

        let (platform, _api, mut window) = headless_window(RenderApiKind::Web);
        let driver = platform.driver_for(window.id()).unwrap();
        let esc = Key::Named(NamedKey::Escape);
        driver.input(InputEvent::Key {
            key: esc,
            state: ButtonState::Pressed,
            repeat: false,
        });
        driver.tick(2);

        let pressed = Rc::new(RefCell::new(Vec::new()));
        let p = pressed.clone();
        window.on_update(move |ctx| p.borrow_mut().push(ctx.input.key_pressed(esc)));
        window.show().unwrap();

        assert_eq!(*pressed.borrow(), vec![true, false]);
    }

    #[test]
    fn render_failure_ends_loop_with_error() {
        let (platform, api, mut window) = headless_window(RenderApiKind::Web);
        platform.driver_for(window.id()).unwrap().tick(5);
        api.stats.fail_render.store(true, Ordering::SeqCst);

        assert!(matches!(window.show(), Err(EngineError::Host(_))));
        assert_eq!(window.state(), WindowState::Closed);
    }

    #[test]
    fn show_after_close_is_rejected() {
        let (_platform, _api, mut window) = headless_window(RenderApiKind::Web);
        window.close();
        assert!(matches!(window.show(), Err(EngineError::InvalidState(_))));
        assert!(matches!(window.initialize(), Err(EngineError::InvalidState(_))));
    }

    // ── resize ───────────────────────────────────────────────────────────

    #[test]
    fn next_render_after_resize_uses_new_size() {
        let (platform, _api, mut window) = headless_window(RenderApiKind::Web);
        let driver = platform.driver_for(window.id()).unwrap();
        driver.tick(1);
        driver.resize(PixelSize::new(1024, 768));
        driver.tick(1);

        let sizes = Rc::new(RefCell::new(Vec::new()));
        let s = sizes.clone();
        window.on_render(move |target| s.borrow_mut().push((target.size(), target.generation())));
        window.show().unwrap();

        assert_eq!(
            *sizes.borrow(),
            vec![(INITIAL, 1), (PixelSize::new(1024, 768), 2)]
        );
    }

    #[test]
    fn target_wraps_current_native_texture() {
        let (platform, _api, mut window) = headless_window(RenderApiKind::Web);
        let driver = platform.driver_for(window.id()).unwrap();
        driver.tick(1);
        driver.resize(PixelSize::new(10, 10));
        driver.tick(1);

        let textures = Rc::new(RefCell::new(Vec::new()));
        let t = textures.clone();
        window.on_render(move |target| {
            if let NativeTexture::Web { id } = target.texture() {
                t.borrow_mut().push(*id);
            }
        });
        window.show().unwrap();

        let textures = textures.borrow();
        assert_eq!(textures.len(), 2);
        assert_ne!(textures[0], textures[1]);
    }

    // ── close ────────────────────────────────────────────────────────────

    #[test]
    fn close_releases_in_order() {
        let log = OrderLog::default();
        let api = FakeRenderApi::with_log(RenderApiKind::Web, log.clone());
        let mut window = Window::new(
            Box::new(LoggingNative::new(7, INITIAL, log.clone())),
            api,
            &WindowSettings::default(),
            WindowRoster::new(),
        );
        window.initialize().unwrap();

        let guard = log.on_drop("callbacks released");
        window.on_render(move |_| {
            let _ = &guard;
        });

        window.close();
        assert_eq!(
            log.entries(),
            vec!["create_instance", "callbacks released", "destroy_instance", "native dispose"]
        );
    }

    #[test]
    fn close_is_idempotent() {
        let roster = WindowRoster::new();
        let mut platform = HeadlessPlatform::new();
        let api = FakeRenderApi::new(RenderApiKind::Web);
        let mut window = WindowFactory::new(&mut platform, api.clone(), roster.clone())
            .create(&WindowSettings::default())
            .unwrap();
        window.initialize().unwrap();
        assert_eq!(roster.len(), 1);

        window.close();
        window.close();
        drop(window);

        assert!(roster.is_empty());
        assert_eq!(api.stats.instances_destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(platform.name(), "headless");
    }
}
