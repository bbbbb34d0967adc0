use std::collections::HashSet;

use super::types::{ButtonState, InputEvent, Key, Modifiers, PointerButton, ScrollDelta};

/// Transitions recorded during the current tick.
#[derive(Debug, Default)]
pub struct TickInput {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,
    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,
    pub buttons_pressed: HashSet<PointerButton>,
    pub buttons_released: HashSet<PointerButton>,
    pub text: String,
    /// Accumulated scroll; lines and pixels are summed separately.
    pub scroll_lines: (f32, f32),
    pub scroll_pixels: (f32, f32),
}

impl TickInput {
    fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.text.clear();
        self.scroll_lines = (0.0, 0.0);
        self.scroll_pixels = (0.0, 0.0);
    }
}

/// Input state for one window.
///
/// Held keys, buttons and the pointer persist across ticks; [`TickInput`]
/// collects what changed since the last [`end_tick`](Self::end_tick).
#[derive(Debug, Default)]
pub struct InputController {
    modifiers: Modifiers,
    focused: bool,
    pointer: Option<(f32, f32)>,
    keys_down: HashSet<Key>,
    buttons_down: HashSet<PointerButton>,
    tick: TickInput,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: InputEvent) {
        match &event {
            InputEvent::Modifiers(m) => self.modifiers = *m,

            InputEvent::Focus(focused) => {
                self.focused = *focused;
                // Releases can be missed while unfocused.
                if !focused {
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => self.pointer = Some((*x, *y)),
            InputEvent::PointerLeft => self.pointer = None,

            InputEvent::Key { key, state, .. } => match state {
                ButtonState::Pressed => {
                    if self.keys_down.insert(*key) {
                        self.tick.keys_pressed.insert(*key);
                    }
                }
                ButtonState::Released => {
                    if self.keys_down.remove(key) {
                        self.tick.keys_released.insert(*key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                ButtonState::Pressed => {
                    if self.buttons_down.insert(*button) {
                        self.tick.buttons_pressed.insert(*button);
                    }
                }
                ButtonState::Released => {
                    if self.buttons_down.remove(button) {
                        self.tick.buttons_released.insert(*button);
                    }
                }
            },

            InputEvent::Scroll(ScrollDelta::Lines { x, y }) => {
                self.tick.scroll_lines.0 += x;
                self.tick.scroll_lines.1 += y;
            }
            InputEvent::Scroll(ScrollDelta::Pixels { x, y }) => {
                self.tick.scroll_pixels.0 += x;
                self.tick.scroll_pixels.1 += y;
            }

            InputEvent::Text(text) => self.tick.text.push_str(text),
        }

        self.tick.events.push(event);
    }

    /// Clears per-tick transitions; held state is kept.
    pub fn end_tick(&mut self) {
        self.tick.clear();
    }

    pub fn this_tick(&self) -> &TickInput {
        &self.tick
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.tick.keys_pressed.contains(&key)
    }

    pub fn button_down(&self, button: PointerButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn button_pressed(&self, button: PointerButton) -> bool {
        self.tick.buttons_pressed.contains(&button)
    }

    pub fn pointer(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn focused(&self) -> bool {
        self.focused
    }
}
