use winit::event::{ElementState, Ime, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{self, ModifiersState};

use crate::input::{ButtonState, InputEvent, Key, Modifiers, NamedKey, PointerButton, ScrollDelta};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events the input subsystem does not represent.
pub fn translate(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => Some(InputEvent::Modifiers(map_modifiers(m.state()))),

        WindowEvent::Focused(focused) => Some(InputEvent::Focus(*focused)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),

        WindowEvent::MouseInput { state, button, .. } => Some(InputEvent::PointerButton {
            button: map_button(*button),
            state: map_state(*state),
        }),

        WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Scroll(match delta {
            MouseScrollDelta::LineDelta(x, y) => ScrollDelta::Lines { x: *x, y: *y },
            MouseScrollDelta::PixelDelta(p) => ScrollDelta::Pixels {
                x: p.x as f32,
                y: p.y as f32,
            },
        })),

        WindowEvent::KeyboardInput { event, .. } => Some(InputEvent::Key {
            key: map_key(&event.logical_key),
            state: map_state(event.state),
            repeat: event.repeat,
        }),

        WindowEvent::Ime(Ime::Commit(text)) if !text.is_empty() => Some(InputEvent::Text(text.clone())),

        _ => None,
    }
}

fn map_state(state: ElementState) -> ButtonState {
    match state {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
        MouseButton::Back => PointerButton::Back,
        MouseButton::Forward => PointerButton::Forward,
        MouseButton::Other(v) => PointerButton::Other(v),
    }
}

fn map_key(key: &keyboard::Key) -> Key {
    use keyboard::NamedKey as W;

    match key {
        keyboard::Key::Character(s) => s.chars().next().map_or(Key::Unidentified, Key::char),
        keyboard::Key::Named(named) => {
            let named = match named {
                W::Escape => NamedKey::Escape,
                W::Enter => NamedKey::Enter,
                W::Tab => NamedKey::Tab,
                W::Backspace => NamedKey::Backspace,
                W::Space => NamedKey::Space,
                W::Insert => NamedKey::Insert,
                W::Delete => NamedKey::Delete,
                W::Home => NamedKey::Home,
                W::End => NamedKey::End,
                W::PageUp => NamedKey::PageUp,
                W::PageDown => NamedKey::PageDown,
                W::ArrowUp => NamedKey::ArrowUp,
                W::ArrowDown => NamedKey::ArrowDown,
                W::ArrowLeft => NamedKey::ArrowLeft,
                W::ArrowRight => NamedKey::ArrowRight,
                W::Shift => NamedKey::Shift,
                W::Control => NamedKey::Control,
                W::Alt => NamedKey::Alt,
                W::Super | W::Meta => NamedKey::Meta,
                W::F1 => NamedKey::F(1),
                W::F2 => NamedKey::F(2),
                W::F3 => NamedKey::F(3),
                W::F4 => NamedKey::F(4),
                W::F5 => NamedKey::F(5),
                W::F6 => NamedKey::F(6),
                W::F7 => NamedKey::F(7),
                W::F8 => NamedKey::F(8),
                W::F9 => NamedKey::F(9),
                W::F10 => NamedKey::F(10),
                W::F11 => NamedKey::F(11),
                W::F12 => NamedKey::F(12),
                _ => return Key::Unidentified,
            };
            Key::Named(named)
        }
        _ => Key::Unidentified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    #[test]
    fn characters_are_lowercased() {
        assert_eq!(map_key(&keyboard::Key::Character(SmolStr::new("Q"))), Key::Character('q'));
    }

    #[test]
    fn named_keys_map() {
        assert_eq!(
            map_key(&keyboard::Key::Named(keyboard::NamedKey::Escape)),
            Key::Named(NamedKey::Escape)
        );
        assert_eq!(
            map_key(&keyboard::Key::Named(keyboard::NamedKey::F5)),
            Key::Named(NamedKey::F(5))
        );
    }

    #[test]
    fn focus_and_button_events_translate() {
        assert_eq!(translate(&WindowEvent::Focused(true)), Some(InputEvent::Focus(true)));
        assert_eq!(map_state(ElementState::Released), ButtonState::Released);
        assert_eq!(map_button(MouseButton::Right), PointerButton::Secondary);
    }
}
