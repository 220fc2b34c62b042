//! Keyboard layout
//!
//! Eine Tabelle von Usage-Code zu [`KeyDescriptor`], plus optionale
//! Dead-Key-Tabellen. Das Layout kommt von einem [`LayoutProvider`]; liefert
//! der nichts, wird (falls erlaubt) das eingebaute US-Layout verwendet.

use super::scan::{self, SCAN_NULL};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Which modifier states influence the character of a key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AffectedBy: u8 {
        const SHIFT = 1 << 0;
        const CAPS_LOCK = 1 << 1;
        const NUM_LOCK = 1 << 2;
    }
}

/// Behavior class of a key beyond its characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierClass {
    #[default]
    Null,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    AltGr,
    LeftShift,
    RightShift,
    LeftLogo,
    RightLogo,
    Menu,
    CapsLock,
    NumLock,
    ScrollLock,
    Print,
    SysRequest,
    Pause,
    Break,
    /// Dead key, composes with the next press.
    NonSpacing,
    /// Function key F1..F12.
    Function(u8),
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl ModifierClass {
    /// Scan code reported for a key of this class.
    pub fn scan_code(self) -> u16 {
        match self {
            ModifierClass::Insert => scan::SCAN_INSERT,
            ModifierClass::Delete => scan::SCAN_DELETE,
            ModifierClass::PageDown => scan::SCAN_PAGE_DOWN,
            ModifierClass::PageUp => scan::SCAN_PAGE_UP,
            ModifierClass::Home => scan::SCAN_HOME,
            ModifierClass::End => scan::SCAN_END,
            ModifierClass::Left => scan::SCAN_LEFT,
            ModifierClass::Right => scan::SCAN_RIGHT,
            ModifierClass::Down => scan::SCAN_DOWN,
            ModifierClass::Up => scan::SCAN_UP,
            ModifierClass::Function(n) => scan::function_key(n),
            ModifierClass::Pause => scan::SCAN_PAUSE,
            _ => SCAN_NULL,
        }
    }
}

/// Everything the translator needs to know about one physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyDescriptor {
    pub usage: u8,
    pub unicode: u16,
    pub shifted: u16,
    pub altgr: u16,
    pub shifted_altgr: u16,
    pub modifier: ModifierClass,
    pub affected_by: AffectedBy,
}

impl KeyDescriptor {
    pub fn new(usage: u8, unicode: char, shifted: char, modifier: ModifierClass, affected_by: AffectedBy) -> Self {
        Self {
            usage,
            unicode: ucs2(unicode),
            shifted: ucs2(shifted),
            altgr: 0,
            shifted_altgr: 0,
            modifier,
            affected_by,
        }
    }

    pub fn with_altgr(mut self, altgr: char, shifted_altgr: char) -> Self {
        self.altgr = ucs2(altgr);
        self.shifted_altgr = ucs2(shifted_altgr);
        self
    }
}

/// Characters outside the basic multilingual plane cannot be reported.
fn ucs2(c: char) -> u16 {
    u16::try_from(u32::from(c)).unwrap_or(0)
}

/// Usage codes a keyboard report may carry.
pub fn is_valid_usage(usage: u8) -> bool {
    matches!(usage, 0x04..=0x65 | 0xE0..=0xE7)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    descriptors: HashMap<u8, KeyDescriptor>,
    dead_keys: HashMap<u8, Vec<KeyDescriptor>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: KeyDescriptor) {
        self.descriptors.insert(descriptor.usage, descriptor);
    }

    /// Registers the keys a dead key composes with. `dead` must be a
    /// [`ModifierClass::NonSpacing`] key of this layout.
    pub fn add_dead_key(&mut self, dead: u8, targets: Vec<KeyDescriptor>) {
        self.dead_keys.insert(dead, targets);
    }

    pub fn descriptor(&self, usage: u8) -> Option<&KeyDescriptor> {
        self.descriptors.get(&usage)
    }

    pub fn dead_key_targets(&self, dead: u8) -> Option<&[KeyDescriptor]> {
        self.dead_keys.get(&dead).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Built-in US English layout.
    pub fn us_english() -> Self {
        const NONE: AffectedBy = AffectedBy::empty();
        const S: AffectedBy = AffectedBy::SHIFT;
        const SC: AffectedBy = AffectedBy::SHIFT.union(AffectedBy::CAPS_LOCK);
        const SN: AffectedBy = AffectedBy::SHIFT.union(AffectedBy::NUM_LOCK);
        use ModifierClass as M;

        let mut layout = Layout::new();

        for (usage, c) in (0x04u8..=0x1D).zip('a'..='z') {
            layout.insert(KeyDescriptor::new(usage, c, c.to_ascii_uppercase(), M::Null, SC));
        }

        let table: &[(u8, char, char, ModifierClass, AffectedBy)] = &[
            (0x1E, '1', '!', M::Null, S),
            (0x1F, '2', '@', M::Null, S),
            (0x20, '3', '#', M::Null, S),
            (0x21, '4', '$', M::Null, S),
            (0x22, '5', '%', M::Null, S),
            (0x23, '6', '^', M::Null, S),
            (0x24, '7', '&', M::Null, S),
            (0x25, '8', '*', M::Null, S),
            (0x26, '9', '(', M::Null, S),
            (0x27, '0', ')', M::Null, S),
            (0x28, '\r', '\r', M::Null, NONE),
            (0x29, '\u{1b}', '\u{1b}', M::Null, NONE),
            (0x2A, '\u{08}', '\u{08}', M::Null, NONE),
            (0x2B, '\t', '\t', M::Null, NONE),
            (0x2C, ' ', ' ', M::Null, NONE),
            (0x2D, '-', '_', M::Null, S),
            (0x2E, '=', '+', M::Null, S),
            (0x2F, '[', '{', M::Null, S),
            (0x30, ']', '}', M::Null, S),
            (0x31, '\\', '|', M::Null, S),
            (0x32, '\\', '|', M::Null, S),
            (0x33, ';', ':', M::Null, S),
            (0x34, '\'', '"', M::Null, S),
            (0x35, '`', '~', M::Null, S),
            (0x36, ',', '<', M::Null, S),
            (0x37, '.', '>', M::Null, S),
            (0x38, '/', '?', M::Null, S),
            (0x39, '\0', '\0', M::CapsLock, NONE),
            (0x46, '\0', '\0', M::Print, NONE),
            (0x47, '\0', '\0', M::ScrollLock, NONE),
            (0x48, '\0', '\0', M::Pause, NONE),
            (0x49, '\0', '\0', M::Insert, NONE),
            (0x4A, '\0', '\0', M::Home, NONE),
            (0x4B, '\0', '\0', M::PageUp, NONE),
            (0x4C, '\0', '\0', M::Delete, NONE),
            (0x4D, '\0', '\0', M::End, NONE),
            (0x4E, '\0', '\0', M::PageDown, NONE),
            (0x4F, '\0', '\0', M::Right, NONE),
            (0x50, '\0', '\0', M::Left, NONE),
            (0x51, '\0', '\0', M::Down, NONE),
            (0x52, '\0', '\0', M::Up, NONE),
            (0x53, '\0', '\0', M::NumLock, NONE),
            // Keypad
            (0x54, '/', '/', M::Null, NONE),
            (0x55, '*', '*', M::Null, NONE),
            (0x56, '-', '-', M::Null, NONE),
            (0x57, '+', '+', M::Null, NONE),
            (0x58, '\r', '\r', M::Null, NONE),
            (0x59, '1', '1', M::End, SN),
            (0x5A, '2', '2', M::Down, SN),
            (0x5B, '3', '3', M::PageDown, SN),
            (0x5C, '4', '4', M::Left, SN),
            (0x5D, '5', '5', M::Null, SN),
            (0x5E, '6', '6', M::Right, SN),
            (0x5F, '7', '7', M::Home, SN),
            (0x60, '8', '8', M::Up, SN),
            (0x61, '9', '9', M::PageUp, SN),
            (0x62, '0', '0', M::Insert, SN),
            (0x63, '.', '.', M::Delete, SN),
            (0x64, '\\', '|', M::Null, S),
            (0x65, '\0', '\0', M::Menu, NONE),
            // Modifiers
            (0xE0, '\0', '\0', M::LeftControl, NONE),
            (0xE1, '\0', '\0', M::LeftShift, NONE),
            (0xE2, '\0', '\0', M::LeftAlt, NONE),
            (0xE3, '\0', '\0', M::LeftLogo, NONE),
            (0xE4, '\0', '\0', M::RightControl, NONE),
            (0xE5, '\0', '\0', M::RightShift, NONE),
            (0xE6, '\0', '\0', M::RightAlt, NONE),
            (0xE7, '\0', '\0', M::RightLogo, NONE),
        ];
        for &(usage, unicode, shifted, modifier, affected_by) in table {
            layout.insert(KeyDescriptor::new(usage, unicode, shifted, modifier, affected_by));
        }

        for (usage, n) in (0x3Au8..=0x45).zip(1u8..) {
            layout.insert(KeyDescriptor::new(usage, '\0', '\0', M::Function(n), NONE));
        }

        layout
    }
}

/// Source of the active layout. `None` means the source has nothing to offer.
pub trait LayoutProvider {
    fn layout(&self) -> Option<Layout>;
}

/// Hands out a fixed, caller supplied layout.
#[derive(Debug, Clone)]
pub struct FixedLayout(pub Layout);

impl LayoutProvider for FixedLayout {
    fn layout(&self) -> Option<Layout> {
        Some(self.0.clone())
    }
}

/// Provider without any layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutProvider for NoLayout {
    fn layout(&self) -> Option<Layout> {
        None
    }
}

/// The built-in US English layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLayout;

impl LayoutProvider for BuiltinLayout {
    fn layout(&self) -> Option<Layout> {
        Some(Layout::us_english())
    }
}
