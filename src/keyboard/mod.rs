//! Keyboard side: layouts and the translation of raw key transitions into
//! keystrokes with modifier and lock state.

pub mod layout;
pub mod scan;
pub mod translator;

pub use layout::{BuiltinLayout, FixedLayout, KeyDescriptor, Layout, LayoutProvider, ModifierClass, NoLayout};
pub use translator::{
    InputKey, KeyData, KeyState, Notification, NotifyId, ShiftState, ToggleState, TranslateError,
    Translator, TranslatorEffects,
};
