//! Key codes used in the mapping table.
//!
//! A code is either a USB keyboard usage (0x00..=0xE7), one of the mouse
//! function sentinels (0xF0..=0xF4) or the disabled sentinel 0xFF. In the
//! config file codes can be written as names (`KeyEnter`, `MouseLeft`),
//! as hex (`0x28`, `28`) or as plain integers.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeParseError {
    #[error("Empty key code")]
    Empty,
    #[error("Unknown key code: {0}")]
    Unknown(String),
}

/// Pointer action a code can be bound to instead of a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseFunction {
    Left,
    Right,
    Middle,
    ScrollUp,
    ScrollDown,
}

/// What a code resolves to when the diff engine acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Disabled,
    Key(u8),
    Mouse(MouseFunction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u8);

impl Default for KeyCode {
    fn default() -> Self {
        KeyCode::DISABLED
    }
}

impl KeyCode {
    pub const DISABLED: KeyCode = KeyCode(0xFF);
    pub const MOUSE_LEFT: KeyCode = KeyCode(0xF0);
    pub const MOUSE_RIGHT: KeyCode = KeyCode(0xF1);
    pub const MOUSE_MIDDLE: KeyCode = KeyCode(0xF2);
    pub const SCROLL_UP: KeyCode = KeyCode(0xF3);
    pub const SCROLL_DOWN: KeyCode = KeyCode(0xF4);

    pub const ENTER: KeyCode = KeyCode(0x28);
    pub const ESCAPE: KeyCode = KeyCode(0x29);
    pub const BACKSPACE: KeyCode = KeyCode(0x2A);
    pub const TAB: KeyCode = KeyCode(0x2B);
    pub const SPACE: KeyCode = KeyCode(0x2C);
    pub const PAGE_UP: KeyCode = KeyCode(0x4B);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x4E);
    pub const RIGHT: KeyCode = KeyCode(0x4F);
    pub const LEFT: KeyCode = KeyCode(0x50);
    pub const DOWN: KeyCode = KeyCode(0x51);
    pub const UP: KeyCode = KeyCode(0x52);
    pub const LEFT_CTRL: KeyCode = KeyCode(0xE0);
    pub const LEFT_SHIFT: KeyCode = KeyCode(0xE1);
    pub const LEFT_ALT: KeyCode = KeyCode(0xE2);
    pub const KEY_A: KeyCode = KeyCode(0x04);
    pub const KEY_D: KeyCode = KeyCode(0x07);
    pub const KEY_S: KeyCode = KeyCode(0x16);
    pub const KEY_W: KeyCode = KeyCode(0x1A);

    /// Keyboard usage, mouse function or disabled. Everything else is rejected by sanitizing.
    pub fn is_valid(self) -> bool {
        self.0 <= 0xE7 || (0xF0..=0xF4).contains(&self.0) || self.0 == 0xFF
    }

    pub fn binding(self) -> Binding {
        match self.0 {
            0xF0 => Binding::Mouse(MouseFunction::Left),
            0xF1 => Binding::Mouse(MouseFunction::Right),
            0xF2 => Binding::Mouse(MouseFunction::Middle),
            0xF3 => Binding::Mouse(MouseFunction::ScrollUp),
            0xF4 => Binding::Mouse(MouseFunction::ScrollDown),
            code @ 0x00..=0xE7 => Binding::Key(code),
            _ => Binding::Disabled,
        }
    }

    /// Canonical name from the key-name table, if the code has one.
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(name, _)| *name)
    }

    /// Parses like `FromStr` but maps anything unparsable to `DISABLED`.
    pub fn parse_lenient(value: &str) -> KeyCode {
        value.parse().unwrap_or(KeyCode::DISABLED)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

impl FromStr for KeyCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(CodeParseError::Empty);
        }

        if let Some(hex) = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        {
            return u8::from_str_radix(hex, 16)
                .map(KeyCode)
                .map_err(|_| CodeParseError::Unknown(value.to_string()));
        }

        if value.len() <= 2 && value.chars().all(|c| c.is_ascii_hexdigit()) {
            return u8::from_str_radix(value, 16)
                .map(KeyCode)
                .map_err(|_| CodeParseError::Unknown(value.to_string()));
        }

        KEY_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map(|(_, code)| KeyCode(*code))
            .ok_or_else(|| CodeParseError::Unknown(value.to_string()))
    }
}

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct KeyCodeVisitor;

impl Visitor<'_> for KeyCodeVisitor {
    type Value = KeyCode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a key name, a hex code or an integer between 0 and 255")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<KeyCode, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<KeyCode, E> {
        u8::try_from(v)
            .map(KeyCode)
            .map_err(|_| E::custom(format!("key code out of range: {v}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<KeyCode, E> {
        u8::try_from(v)
            .map(KeyCode)
            .map_err(|_| E::custom(format!("key code out of range: {v}")))
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyCodeVisitor)
    }
}

/// Names accepted in the config file. The first entry for a code is its canonical name.
pub static KEY_NAMES: &[(&str, u8)] = &[
    ("KeyA", 0x04),
    ("KeyB", 0x05),
    ("KeyC", 0x06),
    ("KeyD", 0x07),
    ("KeyE", 0x08),
    ("KeyF", 0x09),
    ("KeyG", 0x0A),
    ("KeyH", 0x0B),
    ("KeyI", 0x0C),
    ("KeyJ", 0x0D),
    ("KeyK", 0x0E),
    ("KeyL", 0x0F),
    ("KeyM", 0x10),
    ("KeyN", 0x11),
    ("KeyO", 0x12),
    ("KeyP", 0x13),
    ("KeyQ", 0x14),
    ("KeyR", 0x15),
    ("KeyS", 0x16),
    ("KeyT", 0x17),
    ("KeyU", 0x18),
    ("KeyV", 0x19),
    ("KeyW", 0x1A),
    ("KeyX", 0x1B),
    ("KeyY", 0x1C),
    ("KeyZ", 0x1D),
    ("Key1", 0x1E),
    ("Key2", 0x1F),
    ("Key3", 0x20),
    ("Key4", 0x21),
    ("Key5", 0x22),
    ("Key6", 0x23),
    ("Key7", 0x24),
    ("Key8", 0x25),
    ("Key9", 0x26),
    ("Key0", 0x27),
    ("KeyEnter", 0x28),
    ("KeyReturn", 0x28),
    ("KeyEscape", 0x29),
    ("KeyEsc", 0x29),
    ("KeyBackspace", 0x2A),
    ("KeyTab", 0x2B),
    ("KeySpace", 0x2C),
    ("KeyMinus", 0x2D),
    ("KeyEqual", 0x2E),
    ("KeyLeftBracket", 0x2F),
    ("KeyRightBracket", 0x30),
    ("KeyBackslash", 0x31),
    ("KeySemicolon", 0x33),
    ("KeyApostrophe", 0x34),
    ("KeyQuote", 0x34),
    ("KeyGrave", 0x35),
    ("KeyTilde", 0x35),
    ("KeyComma", 0x36),
    ("KeyPeriod", 0x37),
    ("KeyDot", 0x37),
    ("KeySlash", 0x38),
    ("KeyCapsLock", 0x39),
    ("KeyF1", 0x3A),
    ("KeyF2", 0x3B),
    ("KeyF3", 0x3C),
    ("KeyF4", 0x3D),
    ("KeyF5", 0x3E),
    ("KeyF6", 0x3F),
    ("KeyF7", 0x40),
    ("KeyF8", 0x41),
    ("KeyF9", 0x42),
    ("KeyF10", 0x43),
    ("KeyF11", 0x44),
    ("KeyF12", 0x45),
    ("KeyPrintScreen", 0x46),
    ("KeyPrtSc", 0x46),
    ("KeyScrollLock", 0x47),
    ("KeyPause", 0x48),
    ("KeyInsert", 0x49),
    ("KeyIns", 0x49),
    ("KeyHome", 0x4A),
    ("KeyPageUp", 0x4B),
    ("KeyPgUp", 0x4B),
    ("KeyDelete", 0x4C),
    ("KeyDel", 0x4C),
    ("KeyEnd", 0x4D),
    ("KeyPageDown", 0x4E),
    ("KeyPgDown", 0x4E),
    ("KeyPgDn", 0x4E),
    ("KeyRight", 0x4F),
    ("KeyLeft", 0x50),
    ("KeyDown", 0x51),
    ("KeyUp", 0x52),
    ("KeyArrowRight", 0x4F),
    ("KeyArrowLeft", 0x50),
    ("KeyArrowDown", 0x51),
    ("KeyArrowUp", 0x52),
    ("KeyNumLock", 0x53),
    ("KeyKpDivide", 0x54),
    ("KeyKpSlash", 0x54),
    ("KeyKpMultiply", 0x55),
    ("KeyKpStar", 0x55),
    ("KeyKpMinus", 0x56),
    ("KeyKpPlus", 0x57),
    ("KeyKpEnter", 0x58),
    ("KeyKp1", 0x59),
    ("KeyKp2", 0x5A),
    ("KeyKp3", 0x5B),
    ("KeyKp4", 0x5C),
    ("KeyKp5", 0x5D),
    ("KeyKp6", 0x5E),
    ("KeyKp7", 0x5F),
    ("KeyKp8", 0x60),
    ("KeyKp9", 0x61),
    ("KeyKp0", 0x62),
    ("KeyKpDot", 0x63),
    ("KeyKpPeriod", 0x63),
    ("KeyApplication", 0x65),
    ("KeyMenu", 0x65),
    ("KeyLeftCtrl", 0xE0),
    ("KeyLeftControl", 0xE0),
    ("KeyLCtrl", 0xE0),
    ("KeyLeftShift", 0xE1),
    ("KeyLShift", 0xE1),
    ("KeyLeftAlt", 0xE2),
    ("KeyLAlt", 0xE2),
    ("KeyLeftMeta", 0xE3),
    ("KeyLeftWin", 0xE3),
    ("KeyLeftSuper", 0xE3),
    ("KeyLWin", 0xE3),
    ("KeyRightCtrl", 0xE4),
    ("KeyRightControl", 0xE4),
    ("KeyRCtrl", 0xE4),
    ("KeyRightShift", 0xE5),
    ("KeyRShift", 0xE5),
    ("KeyRightAlt", 0xE6),
    ("KeyRAlt", 0xE6),
    ("KeyRightMeta", 0xE7),
    ("KeyRightWin", 0xE7),
    ("KeyRightSuper", 0xE7),
    ("KeyRWin", 0xE7),
    ("MouseLeft", 0xF0),
    ("MouseLeftButton", 0xF0),
    ("MouseRight", 0xF1),
    ("MouseRightButton", 0xF1),
    ("MouseMiddle", 0xF2),
    ("MouseMiddleButton", 0xF2),
    ("ScrollUp", 0xF3),
    ("ScrollDown", 0xF4),
    ("Disabled", 0xFF),
    ("None", 0xFF),
    ("Off", 0xFF),
];
