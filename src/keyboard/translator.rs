//! Key Translator
//!
//! Turns queued [`KeyTransition`]s into [`KeyData`] using the active layout,
//! the modifier state and a pending dead key.
//!
//! ```text
//! KeyTransition ─► release? ──► clear modifier ─────────────► NotReady
//!                  press ─────► set modifier / toggle lock
//!                               │
//!                               ├─ dead key ───► remember ──► NotReady
//!                               └─ resolve (dead key, shift, altgr,
//!                                  caps, num lock, ESC) ─────► KeyData
//!                                                               │
//!                                                 notify match ─┘
//! ```

use super::layout::{is_valid_usage, AffectedBy, KeyDescriptor, Layout, ModifierClass};
use super::scan::{CHAR_ESC, CHAR_NULL, SCAN_ESC, SCAN_NULL};
use crate::controller::diff::KeyTransition;
use crate::controller::queue::{EventQueue, QUEUE_SLOTS};
use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, info, warn};

bitflags! {
    /// Modifier part of a keystroke's state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShiftState: u32 {
        const VALID = 0x8000_0000;
        const RIGHT_SHIFT = 0x0000_0001;
        const LEFT_SHIFT = 0x0000_0002;
        const RIGHT_CONTROL = 0x0000_0004;
        const LEFT_CONTROL = 0x0000_0008;
        const RIGHT_ALT = 0x0000_0010;
        const LEFT_ALT = 0x0000_0020;
        const RIGHT_LOGO = 0x0000_0040;
        const LEFT_LOGO = 0x0000_0080;
        const MENU = 0x0000_0100;
        const SYS_REQ = 0x0000_0200;
    }
}

bitflags! {
    /// Lock part of a keystroke's state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ToggleState: u8 {
        const VALID = 0x80;
        const KEY_STATE_EXPOSED = 0x40;
        const SCROLL_LOCK = 0x01;
        const NUM_LOCK = 0x02;
        const CAPS_LOCK = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputKey {
    pub scan_code: u16,
    pub unicode_char: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    pub shift: ShiftState,
    pub toggle: ToggleState,
}

/// A translated keystroke as handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyData {
    pub key: InputKey,
    pub state: KeyState,
}

impl KeyData {
    pub fn character(&self) -> Option<char> {
        match self.key.unicode_char {
            CHAR_NULL => None,
            c => char::from_u32(u32::from(c)),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Invalid usage code {0:#04x}")]
    InvalidScancode(u8),
    #[error("No keystroke available")]
    NotReady,
    #[error("No keyboard layout available")]
    LayoutUnavailable,
    #[error("Toggle state without valid bit")]
    UnsupportedState,
}

/// Currently held modifiers and lock states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub left_ctrl: bool,
    pub right_ctrl: bool,
    pub left_alt: bool,
    pub right_alt: bool,
    pub alt_gr: bool,
    pub left_shift: bool,
    pub right_shift: bool,
    pub left_logo: bool,
    pub right_logo: bool,
    pub menu: bool,
    pub sys_req: bool,
    pub caps_lock: bool,
    pub num_lock: bool,
    pub scroll_lock: bool,
}

impl ModifierState {
    pub fn ctrl(&self) -> bool {
        self.left_ctrl || self.right_ctrl
    }

    pub fn alt(&self) -> bool {
        self.left_alt || self.right_alt
    }

    pub fn shift(&self) -> bool {
        self.left_shift || self.right_shift
    }

    fn release(&mut self, class: ModifierClass) {
        match class {
            ModifierClass::LeftControl => self.left_ctrl = false,
            ModifierClass::RightControl => self.right_ctrl = false,
            ModifierClass::LeftShift => self.left_shift = false,
            ModifierClass::RightShift => self.right_shift = false,
            ModifierClass::LeftAlt => self.left_alt = false,
            ModifierClass::RightAlt => self.right_alt = false,
            ModifierClass::LeftLogo => self.left_logo = false,
            ModifierClass::RightLogo => self.right_logo = false,
            ModifierClass::Menu => self.menu = false,
            ModifierClass::Print | ModifierClass::SysRequest => self.sys_req = false,
            ModifierClass::AltGr => self.alt_gr = false,
            _ => {}
        }
    }

    /// Applies a press. Returns true if a lock toggled.
    fn press(&mut self, class: ModifierClass) -> bool {
        match class {
            ModifierClass::LeftControl => self.left_ctrl = true,
            ModifierClass::RightControl => self.right_ctrl = true,
            ModifierClass::LeftShift => self.left_shift = true,
            ModifierClass::RightShift => self.right_shift = true,
            ModifierClass::LeftAlt => self.left_alt = true,
            ModifierClass::RightAlt => self.right_alt = true,
            ModifierClass::LeftLogo => self.left_logo = true,
            ModifierClass::RightLogo => self.right_logo = true,
            ModifierClass::Menu => self.menu = true,
            ModifierClass::Print | ModifierClass::SysRequest => self.sys_req = true,
            ModifierClass::AltGr => self.alt_gr = true,
            ModifierClass::NumLock => {
                self.num_lock = !self.num_lock;
                return true;
            }
            ModifierClass::CapsLock => {
                self.caps_lock = !self.caps_lock;
                return true;
            }
            ModifierClass::ScrollLock => {
                self.scroll_lock = !self.scroll_lock;
                return true;
            }
            _ => {}
        }
        false
    }

    fn toggle_state(&self) -> ToggleState {
        let mut toggle = ToggleState::VALID;
        toggle.set(ToggleState::SCROLL_LOCK, self.scroll_lock);
        toggle.set(ToggleState::NUM_LOCK, self.num_lock);
        toggle.set(ToggleState::CAPS_LOCK, self.caps_lock);
        toggle
    }
}

/// Handle of a registered notification pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NotifyId(pub u32);

/// A keystroke that matched a registered pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Notification {
    pub id: NotifyId,
    pub key: KeyData,
}

/// Host side effects collected while translating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TranslatorEffects {
    /// Lock indicators must be refreshed with this state.
    pub indicators: Option<ToggleState>,
    /// Ctrl+Alt+Delete was pressed.
    pub warm_reset: bool,
}

impl TranslatorEffects {
    pub fn is_empty(&self) -> bool {
        self.indicators.is_none() && !self.warm_reset
    }
}

pub struct Translator {
    layout: Option<Layout>,
    modifiers: ModifierState,
    pending_dead_key: Option<u8>,
    partial_keys: bool,
    notify: Vec<(NotifyId, KeyData)>,
    next_notify_id: u32,
    notifications: EventQueue<Notification, QUEUE_SLOTS>,
    effects: TranslatorEffects,
}

impl Translator {
    pub fn new(layout: Option<Layout>, partial_keys: bool) -> Self {
        Self {
            layout,
            modifiers: ModifierState::default(),
            pending_dead_key: None,
            partial_keys,
            notify: Vec::new(),
            next_notify_id: 1,
            notifications: EventQueue::new(),
            effects: TranslatorEffects::default(),
        }
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    /// Swaps the active layout. A pending dead key belongs to the old one.
    pub fn set_layout(&mut self, layout: Option<Layout>) {
        self.pending_dead_key = None;
        self.layout = layout;
    }

    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    pub fn pending_dead_key(&self) -> Option<u8> {
        self.pending_dead_key
    }

    pub fn partial_keys(&self) -> bool {
        self.partial_keys
    }

    /// Shift and toggle state as reported with every keystroke.
    pub fn key_state(&self) -> KeyState {
        let m = &self.modifiers;
        let mut shift = ShiftState::VALID;
        shift.set(ShiftState::LEFT_CONTROL, m.left_ctrl);
        shift.set(ShiftState::RIGHT_CONTROL, m.right_ctrl);
        shift.set(ShiftState::LEFT_ALT, m.left_alt);
        shift.set(ShiftState::RIGHT_ALT, m.right_alt);
        shift.set(ShiftState::LEFT_SHIFT, m.left_shift);
        shift.set(ShiftState::RIGHT_SHIFT, m.right_shift);
        shift.set(ShiftState::LEFT_LOGO, m.left_logo);
        shift.set(ShiftState::RIGHT_LOGO, m.right_logo);
        shift.set(ShiftState::MENU, m.menu);
        shift.set(ShiftState::SYS_REQ, m.sys_req);

        let mut toggle = m.toggle_state();
        toggle.set(ToggleState::KEY_STATE_EXPOSED, self.partial_keys);
        KeyState { shift, toggle }
    }

    /// Translates one transition. Anything that does not yield a keystroke
    /// (releases, bare modifiers, dead keys) returns [`TranslateError::NotReady`].
    pub fn translate(&mut self, transition: KeyTransition) -> Result<KeyData, TranslateError> {
        let Some(layout) = self.layout.as_ref() else {
            return Err(TranslateError::LayoutUnavailable);
        };
        if !is_valid_usage(transition.code) {
            return Err(TranslateError::InvalidScancode(transition.code));
        }
        let descriptor = *layout
            .descriptor(transition.code)
            .ok_or(TranslateError::InvalidScancode(transition.code))?;

        if !transition.pressed {
            self.modifiers.release(descriptor.modifier);
            return Err(TranslateError::NotReady);
        }

        if self.modifiers.press(descriptor.modifier) {
            self.effects.indicators = Some(self.modifiers.toggle_state());
        }
        if descriptor.modifier == ModifierClass::Delete && self.modifiers.ctrl() && self.modifiers.alt() {
            warn!("Ctrl+Alt+Delete pressed, requesting warm reset");
            self.effects.warm_reset = true;
        }

        if descriptor.modifier == ModifierClass::NonSpacing {
            self.pending_dead_key = layout
                .dead_key_targets(descriptor.usage)
                .map(|_| descriptor.usage);
            debug!("Dead key {:#04x} pending", descriptor.usage);
            return Err(TranslateError::NotReady);
        }

        let descriptor = match self.pending_dead_key.take() {
            Some(dead) => compose(layout, dead, descriptor),
            None => descriptor,
        };

        let (key, shift_consumed) = self.resolve(&descriptor)?;
        let mut state = self.key_state();
        if shift_consumed {
            state.shift.remove(ShiftState::LEFT_SHIFT | ShiftState::RIGHT_SHIFT);
        }
        let data = KeyData { key, state };

        for &(id, ref pattern) in &self.notify {
            if is_key_registered(pattern, &data) {
                self.notifications.push(Notification { id, key: data });
            }
        }

        Ok(data)
    }

    /// Picks the character and scan code for the held modifiers. The flag is
    /// set when shift went into the character itself, so it is left out of
    /// the reported shift state. The held shift keys stay down.
    fn resolve(&self, descriptor: &KeyDescriptor) -> Result<(InputKey, bool), TranslateError> {
        let m = &self.modifiers;
        let mut shift_consumed = false;
        let mut key = InputKey {
            scan_code: descriptor.modifier.scan_code(),
            unicode_char: descriptor.unicode,
        };

        if descriptor.affected_by.contains(AffectedBy::SHIFT) {
            if m.shift() {
                key.unicode_char = descriptor.shifted;
                shift_consumed = descriptor.unicode != CHAR_NULL
                    && descriptor.shifted != CHAR_NULL
                    && descriptor.unicode != descriptor.shifted;
                if m.alt_gr {
                    key.unicode_char = descriptor.shifted_altgr;
                }
            } else if m.alt_gr {
                key.unicode_char = descriptor.altgr;
            }
        }

        if descriptor.affected_by.contains(AffectedBy::CAPS_LOCK) && m.caps_lock {
            key.unicode_char = if key.unicode_char == descriptor.unicode {
                descriptor.shifted
            } else if key.unicode_char == descriptor.shifted {
                descriptor.unicode
            } else {
                key.unicode_char
            };
        }

        if descriptor.affected_by.contains(AffectedBy::NUM_LOCK) {
            if m.num_lock && !m.shift() {
                key.scan_code = SCAN_NULL;
            } else {
                key.unicode_char = CHAR_NULL;
            }
        }

        if key.unicode_char == CHAR_ESC && key.scan_code == SCAN_NULL {
            key.scan_code = SCAN_ESC;
            key.unicode_char = CHAR_NULL;
        }

        if key.unicode_char == CHAR_NULL && key.scan_code == SCAN_NULL && !self.partial_keys {
            return Err(TranslateError::NotReady);
        }
        Ok((key, shift_consumed))
    }

    /// Overrides the lock states and the partial key setting.
    pub fn set_toggle_state(&mut self, toggle: ToggleState) -> Result<(), TranslateError> {
        if !toggle.contains(ToggleState::VALID) {
            return Err(TranslateError::UnsupportedState);
        }
        self.modifiers.scroll_lock = toggle.contains(ToggleState::SCROLL_LOCK);
        self.modifiers.num_lock = toggle.contains(ToggleState::NUM_LOCK);
        self.modifiers.caps_lock = toggle.contains(ToggleState::CAPS_LOCK);
        self.partial_keys = toggle.contains(ToggleState::KEY_STATE_EXPOSED);
        self.effects.indicators = Some(self.modifiers.toggle_state());
        Ok(())
    }

    /// Registers a notification pattern. Every registration gets its own id,
    /// also when the pattern is already known.
    pub fn register_notify(&mut self, pattern: KeyData) -> NotifyId {
        let id = NotifyId(self.next_notify_id);
        self.next_notify_id = self.next_notify_id.wrapping_add(1);
        self.notify.push((id, pattern));
        id
    }

    pub fn unregister_notify(&mut self, id: NotifyId) -> bool {
        let before = self.notify.len();
        self.notify.retain(|(existing, _)| *existing != id);
        before != self.notify.len()
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.notifications.pop()
    }

    pub fn take_effects(&mut self) -> TranslatorEffects {
        std::mem::take(&mut self.effects)
    }

    /// Clears modifiers, locks, dead key and pending notifications.
    /// Registrations survive.
    pub fn reset(&mut self) {
        self.modifiers = ModifierState::default();
        self.pending_dead_key = None;
        self.notifications.clear();
        self.effects.indicators = Some(self.modifiers.toggle_state());
        info!("Translator state reset");
    }
}

/// Picks the composed descriptor for `pressed` under dead key `dead`,
/// falling back to the key itself.
fn compose(layout: &Layout, dead: u8, pressed: KeyDescriptor) -> KeyDescriptor {
    layout
        .dead_key_targets(dead)
        .and_then(|targets| targets.iter().find(|t| t.usage == pressed.usage))
        .copied()
        .unwrap_or(pressed)
}

/// Pattern match used for notifications. Shift and toggle state only take
/// part when the pattern carries their valid bit.
pub fn is_key_registered(pattern: &KeyData, input: &KeyData) -> bool {
    if pattern.key.scan_code != input.key.scan_code
        || pattern.key.unicode_char != input.key.unicode_char
    {
        return false;
    }
    if pattern.state.shift.contains(ShiftState::VALID) && pattern.state.shift != input.state.shift {
        return false;
    }
    if pattern.state.toggle.contains(ToggleState::VALID)
        && pattern.state.toggle != input.state.toggle
    {
        return false;
    }
    true
}
