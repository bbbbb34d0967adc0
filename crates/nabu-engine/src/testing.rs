//! Fakes shared by unit tests.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use crate::backend::{
    CanvasOps, ColorOps, DrawingBackend, FontId, FontOps, ImageId, ImageOps, Matrix, MatrixOps,
    PaintId, PaintOps, PathId, PathOps, PixelBuffer, PixelBufferOps, SurfaceId, SurfaceOps,
};
use crate::coords::{Color, PixelSize};
use crate::dispatch::{Dispatcher, GpuContext};
use crate::error::{EngineError, Result};
use crate::render::{
    EventHub, FramebufferResized, NativeContext, NativeHandle, NativeTexture, RenderApi,
    RenderApiKind, RenderTarget, Subscription, SurfaceHandle, WindowApiId, WindowApiInfo,
    WindowApiTracker, WindowRenderApi,
};
use crate::swapchain::{HostCompositor, PresentCompleter, PresentFault, PresentHandle};
use crate::window::{HostEvent, LoopControl, NativeWindow};

// ── ordering log ─────────────────────────────────────────────────────────

/// Shared, ordered record of what fakes observed.
#[derive(Clone, Default)]
pub(crate) struct OrderLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderLog {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Records `label` when the returned marker drops.
    pub(crate) fn on_drop(&self, label: &str) -> DropMarker {
        DropMarker {
            log: self.clone(),
            label: label.to_owned(),
        }
    }
}

pub(crate) struct DropMarker {
    log: OrderLog,
    label: String,
}

impl Drop for DropMarker {
    fn drop(&mut self) {
        self.log.push(self.label.clone());
    }
}

fn record(log: &Option<OrderLog>, entry: &str) {
    if let Some(log) = log {
        log.push(entry);
    }
}

// ── backend ──────────────────────────────────────────────────────────────

struct FakeOps;

impl ColorOps for FakeOps {
    fn to_native(&self, color: Color) -> u32 {
        color.to_argb32()
    }
}

impl ImageOps for FakeOps {
    fn create_image(&self, _size: PixelSize) -> anyhow::Result<ImageId> {
        Ok(ImageId(1))
    }
    fn image_size(&self, _image: ImageId) -> Option<PixelSize> {
        None
    }
    fn release_image(&self, _image: ImageId) {}
}

impl CanvasOps for FakeOps {
    fn clear(&self, _target: &RenderTarget, _color: Color) -> anyhow::Result<()> {
        Ok(())
    }
    fn draw_image(&self, _target: &RenderTarget, _image: ImageId, _transform: Matrix) -> anyhow::Result<()> {
        Ok(())
    }
    fn draw_path(&self, _target: &RenderTarget, _path: PathId, _paint: PaintId) -> anyhow::Result<()> {
        Ok(())
    }
}

impl PaintOps for FakeOps {
    fn create_solid(&self, _color: Color) -> PaintId {
        PaintId(1)
    }
    fn release_paint(&self, _paint: PaintId) {}
}

impl PathOps for FakeOps {
    fn create_path(&self) -> PathId {
        PathId(1)
    }
    fn move_to(&self, _path: PathId, _x: f32, _y: f32) {}
    fn line_to(&self, _path: PathId, _x: f32, _y: f32) {}
    fn close(&self, _path: PathId) {}
    fn release_path(&self, _path: PathId) {}
}

impl MatrixOps for FakeOps {}

impl PixelBufferOps for FakeOps {
    fn read_pixels(&self, target: &RenderTarget) -> anyhow::Result<PixelBuffer> {
        let size = target.size();
        Ok(PixelBuffer {
            size,
            stride: size.width * 4,
            data: vec![0; (size.area() * 4) as usize],
        })
    }
}

impl SurfaceOps for FakeOps {
    fn create_surface(&self, _size: PixelSize) -> anyhow::Result<SurfaceId> {
        Ok(SurfaceId(1))
    }
    fn release_surface(&self, _surface: SurfaceId) {}
}

impl FontOps for FakeOps {
    fn load_font(&self, _bytes: &[u8]) -> anyhow::Result<FontId> {
        Ok(FontId(1))
    }
    fn release_font(&self, _font: FontId) {}
}

pub(crate) struct FakeBackend {
    name: String,
    ops: FakeOps,
    log: Option<OrderLog>,
    pub(crate) setup_calls: AtomicUsize,
    pub(crate) dispatcher_attached: AtomicUsize,
    pub(crate) dispose_calls: Arc<AtomicUsize>,
    pub(crate) fail_setup: AtomicBool,
    setup_thread: Mutex<Option<String>>,
    setup_kind: Mutex<Option<RenderApiKind>>,
}

impl FakeBackend {
    pub(crate) fn named(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, None))
    }

    pub(crate) fn with_log(name: &str, log: OrderLog) -> Arc<Self> {
        Arc::new(Self::build(name, Some(log)))
    }

    fn build(name: &str, log: Option<OrderLog>) -> Self {
        Self {
            name: name.to_owned(),
            ops: FakeOps,
            log,
            setup_calls: AtomicUsize::new(0),
            dispatcher_attached: AtomicUsize::new(0),
            dispose_calls: Arc::new(AtomicUsize::new(0)),
            fail_setup: AtomicBool::new(false),
            setup_thread: Mutex::new(None),
            setup_kind: Mutex::new(None),
        }
    }

    pub(crate) fn setup_thread(&self) -> Option<String> {
        self.setup_thread.lock().unwrap().clone()
    }

    pub(crate) fn setup_kind(&self) -> Option<RenderApiKind> {
        *self.setup_kind.lock().unwrap()
    }
}

impl DrawingBackend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self, render_api: &dyn RenderApi) -> anyhow::Result<()> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        *self.setup_thread.lock().unwrap() = std::thread::current().name().map(str::to_owned);
        *self.setup_kind.lock().unwrap() = Some(render_api.kind());
        record(&self.log, "backend.setup");
        if self.fail_setup.load(Ordering::SeqCst) {
            anyhow::bail!("{}: no GPU", self.name);
        }
        Ok(())
    }

    fn is_hardware_accelerated(&self) -> bool {
        false
    }

    fn attach_dispatcher(&self, _dispatcher: Arc<dyn Dispatcher>) {
        self.dispatcher_attached.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&self) -> BoxFuture<'static, ()> {
        let calls = self.dispose_calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    }

    fn color(&self) -> &dyn ColorOps {
        &self.ops
    }
    fn image(&self) -> &dyn ImageOps {
        &self.ops
    }
    fn canvas(&self) -> &dyn CanvasOps {
        &self.ops
    }
    fn paint(&self) -> &dyn PaintOps {
        &self.ops
    }
    fn path(&self) -> &dyn PathOps {
        &self.ops
    }
    fn matrix(&self) -> &dyn MatrixOps {
        &self.ops
    }
    fn pixel_buffer(&self) -> &dyn PixelBufferOps {
        &self.ops
    }
    fn surface(&self) -> &dyn SurfaceOps {
        &self.ops
    }
    fn font(&self) -> &dyn FontOps {
        &self.ops
    }
}

// ── render API ───────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct RenderStats {
    pub(crate) window_apis_created: AtomicUsize,
    pub(crate) instances_created: AtomicUsize,
    pub(crate) instances_destroyed: AtomicUsize,
    pub(crate) renders: AtomicUsize,
    pub(crate) fail_instance: AtomicBool,
    pub(crate) fail_render: AtomicBool,
    shapes: Mutex<Vec<&'static str>>,
}

impl RenderStats {
    pub(crate) fn shapes(&self) -> Vec<&'static str> {
        self.shapes.lock().unwrap().clone()
    }
}

pub(crate) struct FakeRenderApi {
    kind: RenderApiKind,
    tracker: WindowApiTracker,
    pub(crate) stats: Arc<RenderStats>,
    log: Option<OrderLog>,
}

impl FakeRenderApi {
    pub(crate) fn new(kind: RenderApiKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            tracker: WindowApiTracker::new(),
            stats: Arc::default(),
            log: None,
        })
    }

    pub(crate) fn with_log(kind: RenderApiKind, log: OrderLog) -> Arc<Self> {
        Arc::new(Self {
            kind,
            tracker: WindowApiTracker::new(),
            stats: Arc::default(),
            log: Some(log),
        })
    }
}

impl RenderApi for FakeRenderApi {
    fn kind(&self) -> RenderApiKind {
        self.kind
    }

    fn create_window_api(&self) -> anyhow::Result<Box<dyn WindowRenderApi>> {
        self.stats.window_apis_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeWindowApi {
            id: self.tracker.register(PixelSize::default()),
            tracker: self.tracker.clone(),
            stats: self.stats.clone(),
            log: self.log.clone(),
            size: PixelSize::default(),
            instance: false,
            texture_id: 0,
            resized: EventHub::new(),
        }))
    }

    fn window_apis(&self) -> Vec<WindowApiInfo> {
        self.tracker.snapshot()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FakeWindowApi {
    id: WindowApiId,
    tracker: WindowApiTracker,
    stats: Arc<RenderStats>,
    log: Option<OrderLog>,
    size: PixelSize,
    instance: bool,
    texture_id: u64,
    resized: EventHub<FramebufferResized>,
}

impl WindowRenderApi for FakeWindowApi {
    fn id(&self) -> WindowApiId {
        self.id
    }

    fn create_instance(&mut self, native: NativeContext, size: PixelSize) -> anyhow::Result<()> {
        if self.stats.fail_instance.load(Ordering::SeqCst) {
            anyhow::bail!("driver refused the {} context", native.shape());
        }
        self.stats.shapes.lock().unwrap().push(native.shape());
        self.stats.instances_created.fetch_add(1, Ordering::SeqCst);
        record(&self.log, "create_instance");

        self.instance = true;
        self.size = size;
        self.texture_id += 1;
        self.tracker.update(self.id, size, true);
        Ok(())
    }

    fn destroy_instance(&mut self) {
        if self.instance {
            self.instance = false;
            self.stats.instances_destroyed.fetch_add(1, Ordering::SeqCst);
            record(&self.log, "destroy_instance");
        }
    }

    fn has_instance(&self) -> bool {
        self.instance
    }

    fn size(&self) -> PixelSize {
        self.size
    }

    fn resize(&mut self, size: PixelSize) -> anyhow::Result<()> {
        if size == self.size {
            return Ok(());
        }
        self.size = size;
        if self.instance {
            self.texture_id += 1;
            self.resized.emit(FramebufferResized { size });
        }
        Ok(())
    }

    fn subscribe_resized(&self) -> Subscription<FramebufferResized> {
        self.resized.subscribe()
    }

    fn texture(&self) -> Option<NativeTexture> {
        self.instance.then(|| NativeTexture::Web { id: self.texture_id })
    }

    fn render(&mut self, draw: &mut dyn FnMut()) -> anyhow::Result<()> {
        if self.stats.fail_render.load(Ordering::SeqCst) {
            anyhow::bail!("device lost");
        }
        draw();
        self.stats.renders.fetch_add(1, Ordering::SeqCst);
        record(&self.log, "render");
        Ok(())
    }
}

impl Drop for FakeWindowApi {
    fn drop(&mut self) {
        self.tracker.remove(self.id);
    }
}

// ── native window ────────────────────────────────────────────────────────

/// Native window that records its disposal and runs an empty loop.
pub(crate) struct LoggingNative {
    id: u64,
    size: PixelSize,
    log: OrderLog,
    surface: bool,
    disposed: bool,
}

impl LoggingNative {
    pub(crate) fn new(id: u64, size: PixelSize, log: OrderLog) -> Self {
        Self {
            id,
            size,
            log,
            surface: false,
            disposed: false,
        }
    }

    /// Hands out a [`StubSurface`] to surface-based render APIs.
    pub(crate) fn with_surface(mut self) -> Self {
        self.surface = true;
        self
    }
}

/// Surface source with no OS window behind it; the fake render APIs never
/// ask it for raw handles.
pub(crate) struct StubSurface;

impl HasWindowHandle for StubSurface {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for StubSurface {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl NativeWindow for LoggingNative {
    fn id(&self) -> u64 {
        self.id
    }
    fn title(&self) -> &str {
        "logging"
    }
    fn size(&self) -> PixelSize {
        self.size
    }
    fn gpu_context(&self) -> Result<Arc<dyn GpuContext>> {
        Err(EngineError::UnsupportedBackend {
            api: RenderApiKind::OpenGl,
            by: "logging native",
        })
    }
    fn surface_handle(&self) -> Result<SurfaceHandle> {
        if !self.surface {
            return Err(EngineError::UnsupportedBackend {
                api: RenderApiKind::Vulkan,
                by: "logging native",
            });
        }
        Ok(SurfaceHandle::new(Arc::new(StubSurface)))
    }
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::Headless { id: self.id }
    }
    fn set_visible(&mut self, _visible: bool) {}
    fn set_topmost(&mut self, _on_top: bool) {}
    fn run(&mut self, _handler: &mut dyn FnMut(HostEvent) -> LoopControl) -> anyhow::Result<()> {
        Ok(())
    }
    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.log.push("native dispose");
        }
    }
}

// ── compositor ───────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct CompositorLog {
    created: AtomicUsize,
    began: Mutex<Vec<u32>>,
    presented: Mutex<Vec<u32>>,
    disposed: Mutex<Vec<u32>>,
}

impl CompositorLog {
    pub(crate) fn disposed(&self) -> Vec<u32> {
        self.disposed.lock().unwrap().clone()
    }
}

/// Compositor whose images are plain ids, starting at 1.
///
/// In manual mode every present stays pending until the test resolves it.
pub(crate) struct FakeCompositor {
    log: Arc<CompositorLog>,
    next: AtomicU32,
    auto_complete: bool,
    fail_alloc: AtomicBool,
    pending: Mutex<HashMap<u32, PresentCompleter>>,
}

impl FakeCompositor {
    fn build(auto_complete: bool) -> Self {
        Self {
            log: Arc::default(),
            next: AtomicU32::new(1),
            auto_complete,
            fail_alloc: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn manual() -> Self {
        Self::build(false)
    }

    pub(crate) fn auto_complete() -> Self {
        Self::build(true)
    }

    pub(crate) fn log(&self) -> Arc<CompositorLog> {
        self.log.clone()
    }

    pub(crate) fn created(&self) -> usize {
        self.log.created.load(Ordering::SeqCst)
    }

    pub(crate) fn began(&self) -> Vec<u32> {
        self.log.began.lock().unwrap().clone()
    }

    pub(crate) fn presented(&self) -> Vec<u32> {
        self.log.presented.lock().unwrap().clone()
    }

    pub(crate) fn disposed(&self) -> Vec<u32> {
        self.log.disposed()
    }

    pub(crate) fn fail_allocations(&self, fail: bool) {
        self.fail_alloc.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn complete(&self, id: u32) {
        if let Some(completer) = self.pending.lock().unwrap().remove(&id) {
            completer.complete();
        }
    }

    pub(crate) fn fail(&self, id: u32) {
        if let Some(completer) = self.pending.lock().unwrap().remove(&id) {
            completer.fail(PresentFault::Rejected(format!("image {id}")));
        }
    }

    pub(crate) fn assert_each_disposed_once(&self) {
        let mut disposed = self.disposed();
        let total = disposed.len();
        disposed.sort_unstable();
        disposed.dedup();
        assert_eq!(disposed.len(), total, "an image was disposed twice");
    }
}

impl HostCompositor for FakeCompositor {
    type Image = u32;

    fn create_image(&self, _size: PixelSize) -> anyhow::Result<u32> {
        if self.fail_alloc.load(Ordering::SeqCst) {
            anyhow::bail!("out of video memory");
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }

    fn begin_draw(&self, image: &u32) {
        self.log.began.lock().unwrap().push(*image);
    }

    fn present(&self, image: &u32) -> PresentHandle {
        self.log.presented.lock().unwrap().push(*image);
        if self.auto_complete {
            return PresentHandle::completed();
        }
        let (completer, handle) = PresentHandle::channel();
        self.pending.lock().unwrap().insert(*image, completer);
        handle
    }

    fn dispose_image(&self, image: u32) {
        self.log.disposed.lock().unwrap().push(image);
    }
}
