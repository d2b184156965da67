//! Keyboard keys, mouse buttons and scroll directions understood by the robot

use serde::{Deserialize, Serialize};
use std::fmt;

/// A keyboard key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Alt,
    Control,
    Shift,
    Meta,
    Enter,
    Tab,
    Escape,
    Space,
    BackSpace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    /// A printable character key
    Char(char),
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(self, Key::Alt | Key::Control | Key::Shift | Key::Meta)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

/// A set of keys pushed together, e.g. `Ctrl+Shift+S`.
///
/// Keys are pressed in order and released in reverse order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombination {
    keys: Vec<Key>,
}

impl KeyCombination {
    pub fn new(keys: impl Into<Vec<Key>>) -> Self {
        Self { keys: keys.into() }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The platform shortcut that closes the focused window.
    pub fn close_window() -> Self {
        if cfg!(target_os = "macos") {
            Self::new([Key::Meta, Key::Char('w')])
        } else {
            Self::new([Key::Alt, Key::F4])
        }
    }
}

impl Default for KeyCombination {
    fn default() -> Self {
        Self::close_window()
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.keys.iter().map(|k| k.to_string()).collect();
        write!(f, "{}", parts.join("+"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalDirection {
    Left,
    Right,
}

const SCROLL_ONE_UP_OR_LEFT: i32 = -1;
const SCROLL_ONE_DOWN_OR_RIGHT: i32 = 1;

impl VerticalDirection {
    /// The signed single scroll tick for this direction.
    pub fn tick(self) -> i32 {
        match self {
            VerticalDirection::Up => SCROLL_ONE_UP_OR_LEFT,
            VerticalDirection::Down => SCROLL_ONE_DOWN_OR_RIGHT,
        }
    }
}

impl HorizontalDirection {
    /// The signed single scroll tick for this direction.
    pub fn tick(self) -> i32 {
        match self {
            HorizontalDirection::Left => SCROLL_ONE_UP_OR_LEFT,
            HorizontalDirection::Right => SCROLL_ONE_DOWN_OR_RIGHT,
        }
    }
}
