//! Windows, the platforms that create them, and their lifecycle.

mod headless;
mod lifecycle;
mod platform;
mod winit;

pub use headless::{HeadlessContext, HeadlessDriver, HeadlessPlatform};
pub use lifecycle::{RenderCallback, UpdateCallback, UpdateCtx, Window, WindowState};
pub use platform::{HostEvent, LoopControl, NativeWindow, WindowFactory, WindowSettings, WindowingPlatform, WindowRoster};
pub use self::winit::WinitPlatform;
