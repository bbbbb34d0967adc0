//! Per-window input.
//!
//! The public API is platform-agnostic; platforms translate their native events
//! into [`InputEvent`]s (see [`platform`]).

mod controller;
pub mod platform;
mod types;

pub use controller::{InputController, TickInput};
pub use types::{ButtonState, InputEvent, Key, Modifiers, NamedKey, PointerButton, ScrollDelta};
