use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::coords::PixelSize;
use crate::dispatch::GpuContext;
use crate::error::{EngineError, Result};
use crate::input::InputEvent;
use crate::render::{NativeHandle, RenderApiKind, SurfaceHandle};

use super::{HostEvent, LoopControl, NativeWindow, WindowSettings, WindowingPlatform};

/// GPU context of the headless platform. Binding is a no-op; calls are counted.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    made_current: AtomicUsize,
    released: AtomicUsize,
}

impl HeadlessContext {
    pub fn made_current(&self) -> usize {
        self.made_current.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl GpuContext for HeadlessContext {
    fn make_current(&self) -> anyhow::Result<()> {
        self.made_current.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_current(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct DriverState {
    script: VecDeque<HostEvent>,
    visible: bool,
    topmost: bool,
    disposed: bool,
}

/// Scripts the host loop of one headless window.
///
/// Events are consumed in order when the window runs; an exhausted script ends
/// the loop as if the host had closed the window.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDriver {
    state: Arc<Mutex<DriverState>>,
}

impl HeadlessDriver {
    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, event: HostEvent) -> &Self {
        self.lock().script.push_back(event);
        self
    }

    pub fn tick(&self, count: usize) -> &Self {
        let mut state = self.lock();
        state.script.extend(std::iter::repeat_n(HostEvent::Tick, count));
        drop(state);
        self
    }

    pub fn resize(&self, size: PixelSize) -> &Self {
        self.push(HostEvent::Resized(size))
    }

    pub fn input(&self, event: InputEvent) -> &Self {
        self.push(HostEvent::Input(event))
    }

    pub fn close(&self) -> &Self {
        self.push(HostEvent::CloseRequested)
    }

    pub fn pending(&self) -> usize {
        self.lock().script.len()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    pub fn is_topmost(&self) -> bool {
        self.lock().topmost
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    fn next(&self) -> Option<HostEvent> {
        self.lock().script.pop_front()
    }
}

struct HeadlessWindow {
    id: u64,
    title: String,
    size: PixelSize,
    driver: HeadlessDriver,
    context: Arc<HeadlessContext>,
}

impl NativeWindow for HeadlessWindow {
    fn id(&self) -> u64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn size(&self) -> PixelSize {
        self.size
    }

    fn gpu_context(&self) -> Result<Arc<dyn GpuContext>> {
        Ok(self.context.clone())
    }

    fn surface_handle(&self) -> Result<SurfaceHandle> {
        Err(EngineError::UnsupportedBackend {
            api: RenderApiKind::Vulkan,
            by: "headless platform",
        })
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle::Headless { id: self.id }
    }

    fn set_visible(&mut self, visible: bool) {
        self.driver.lock().visible = visible;
    }

    fn set_topmost(&mut self, on_top: bool) {
        self.driver.lock().topmost = on_top;
    }

    fn run(&mut self, handler: &mut dyn FnMut(HostEvent) -> LoopControl) -> anyhow::Result<()> {
        while let Some(event) = self.driver.next() {
            if let HostEvent::Resized(size) = &event {
                self.size = *size;
            }
            if handler(event) == LoopControl::Exit {
                break;
            }
        }
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.driver.lock();
        if !state.disposed {
            state.disposed = true;
            state.visible = false;
            log::debug!("headless window {} disposed", self.id);
        }
    }
}

/// In-process windowing platform without an OS counterpart.
///
/// Supplies GPU-context and plain native handles, but no OS surface. Every
/// window starts with a copy of the default script.
#[derive(Default)]
pub struct HeadlessPlatform {
    next_id: u64,
    drivers: BTreeMap<u64, HeadlessDriver>,
    context: Arc<HeadlessContext>,
    default_script: Vec<HostEvent>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_script(mut self, script: impl IntoIterator<Item = HostEvent>) -> Self {
        self.default_script = script.into_iter().collect();
        self
    }

    /// Driver of a live window. Drivers of disposed windows are released
    /// the next time a window is created.
    pub fn driver_for(&self, id: u64) -> Option<HeadlessDriver> {
        self.drivers.get(&id).cloned()
    }

    pub fn gpu_context(&self) -> Arc<HeadlessContext> {
        self.context.clone()
    }

    pub fn windows_created(&self) -> usize {
        self.next_id as usize
    }
}

impl WindowingPlatform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_native_window(&mut self, settings: &WindowSettings) -> anyhow::Result<Box<dyn NativeWindow>> {
        anyhow::ensure!(!settings.size.is_empty(), "window size {} has no area", settings.size);

        self.drivers.retain(|_, driver| !driver.is_disposed());

        self.next_id += 1;
        let id = self.next_id;

        let driver = HeadlessDriver::default();
        for event in &self.default_script {
            driver.push(event.clone());
        }
        self.drivers.insert(id, driver.clone());

        Ok(Box::new(HeadlessWindow {
            id,
            title: settings.title.clone(),
            size: settings.size,
            driver,
            context: self.context.clone(),
        }))
    }
}
