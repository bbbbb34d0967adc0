//! Translation of platform-native events into [`InputEvent`](super::InputEvent)s.

pub mod winit;
