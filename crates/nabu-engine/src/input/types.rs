use std::fmt;

/// Logical key, after keyboard layout is applied.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Named(NamedKey),
    /// Printable key, lowercased so queries do not depend on Shift.
    Character(char),
    Unidentified,
}

impl Key {
    pub fn char(c: char) -> Self {
        Self::Character(c.to_ascii_lowercase())
    }
}

impl From<NamedKey> for Key {
    fn from(key: NamedKey) -> Self {
        Self::Named(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => write!(f, "{named:?}"),
            Self::Character(c) => write!(f, "'{c}'"),
            Self::Unidentified => f.write_str("unidentified"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Control,
    Alt,
    Meta,
    /// Function key `F1`..`F24`.
    F(u8),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Scroll amount; `Lines` for notched wheels, `Pixels` for touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ScrollDelta {
    Lines { x: f32, y: f32 },
    Pixels { x: f32, y: f32 },
}

/// Platform-agnostic input event. Positions are physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Modifiers(Modifiers),
    Key {
        key: Key,
        state: ButtonState,
        repeat: bool,
    },
    PointerMoved {
        x: f32,
        y: f32,
    },
    PointerButton {
        button: PointerButton,
        state: ButtonState,
    },
    PointerLeft,
    Scroll(ScrollDelta),
    /// Committed text (IME commits included).
    Text(String),
    Focus(bool),
}
