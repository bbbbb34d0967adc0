use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context as _;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window as OsWindow, WindowId, WindowLevel};

use crate::coords::PixelSize;
use crate::dispatch::GpuContext;
use crate::error::{EngineError, Result};
use crate::input::platform::winit::translate;
use crate::render::{NativeHandle, RenderApiKind, SurfaceHandle};

use super::{HostEvent, LoopControl, NativeWindow, WindowSettings, WindowingPlatform};

type SharedLoop = Rc<RefCell<Option<EventLoop<()>>>>;

/// OS windows through winit.
///
/// winit runs its event loop once per process, so the first window to `show`
/// drives it; windows must be created before that.
pub struct WinitPlatform {
    event_loop: SharedLoop,
}

impl WinitPlatform {
    pub fn new() -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        Ok(Self {
            event_loop: Rc::new(RefCell::new(Some(event_loop))),
        })
    }
}

impl WindowingPlatform for WinitPlatform {
    fn name(&self) -> &'static str {
        "winit"
    }

    fn create_native_window(&mut self, settings: &WindowSettings) -> anyhow::Result<Box<dyn NativeWindow>> {
        let slot = self.event_loop.borrow();
        let event_loop = slot
            .as_ref()
            .context("winit event loop already ran; windows must be created before show")?;

        let attrs = OsWindow::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::from(settings.size))
            .with_resizable(settings.resizable)
            .with_visible(false);

        // Window::initialize needs the OS surface before show runs the loop,
        // and ActiveEventLoop only exists inside run_app.
        #[allow(deprecated)]
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        Ok(Box::new(WinitWindow {
            title: settings.title.clone(),
            window: Arc::new(window),
            event_loop: self.event_loop.clone(),
            disposed: false,
        }))
    }
}

struct WinitWindow {
    title: String,
    window: Arc<OsWindow>,
    event_loop: SharedLoop,
    disposed: bool,
}

impl NativeWindow for WinitWindow {
    fn id(&self) -> u64 {
        u64::from(self.window.id())
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn size(&self) -> PixelSize {
        self.window.inner_size().into()
    }

    fn gpu_context(&self) -> Result<Arc<dyn GpuContext>> {
        Err(EngineError::UnsupportedBackend {
            api: RenderApiKind::OpenGl,
            by: "winit platform",
        })
    }

    fn surface_handle(&self) -> Result<SurfaceHandle> {
        Ok(SurfaceHandle::new(self.window.clone()))
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle::Window { id: self.id() }
    }

    fn set_visible(&mut self, visible: bool) {
        self.window.set_visible(visible);
    }

    fn set_topmost(&mut self, on_top: bool) {
        self.window.set_window_level(if on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        });
    }

    fn run(&mut self, handler: &mut dyn FnMut(HostEvent) -> LoopControl) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .borrow_mut()
            .take()
            .context("winit event loop can only run once per process")?;

        let mut app = LoopHandler {
            window: &self.window,
            handler,
            exited: false,
        };
        event_loop
            .run_app(&mut app)
            .context("winit event loop terminated with error")
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.window.set_visible(false);
        log::debug!("winit window {:?} disposed", self.window.id());
    }
}

/// Forwards one window's winit events to the engine handler.
struct LoopHandler<'a, 'h> {
    window: &'a OsWindow,
    handler: &'a mut (dyn FnMut(HostEvent) -> LoopControl + 'h),
    exited: bool,
}

impl LoopHandler<'_, '_> {
    fn forward(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        if self.exited {
            return;
        }
        if (self.handler)(event) == LoopControl::Exit {
            self.exited = true;
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for LoopHandler<'_, '_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        self.window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.forward(event_loop, HostEvent::CloseRequested),
            WindowEvent::Destroyed => {
                self.exited = true;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.forward(event_loop, HostEvent::Resized(size.into())),
            WindowEvent::RedrawRequested => {
                self.window.pre_present_notify();
                self.forward(event_loop, HostEvent::Tick);
            }
            other => {
                if let Some(input) = translate(&other) {
                    self.forward(event_loop, HostEvent::Input(input));
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.exited {
            self.window.request_redraw();
        }
    }
}
