//! Mapping-Konfiguration: Button-Tabelle, Trigger und Stick-Einstellungen
//!
//! Nach dem Laden wird die Konfiguration einmal mit [`MappingConfig::sanitize`]
//! bereinigt und danach nur noch gelesen.

use super::codes::KeyCode;
use crate::controller::report::Button;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MAX_AXIS: u16 = 32767;
pub const DEFAULT_TRIGGER_THRESHOLD: u8 = 128;
pub const DEFAULT_SENSITIVITY: u8 = 50;
pub const DEFAULT_SCROLL_SENSITIVITY: u8 = 30;
pub const DEFAULT_MAX_SPEED: u16 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickMode {
    Disabled,
    Keys,
    Mouse,
    Scroll,
}

/// Shaping applied to the normalized stick magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCurve {
    Linear,
    Square,
    Smoothstep,
}

/// 4-way picks the dominant axis, 8-way allows diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DirectionMode {
    FourWay,
    EightWay,
}

impl From<u8> for DirectionMode {
    fn from(value: u8) -> Self {
        match value {
            8 => DirectionMode::EightWay,
            4 => DirectionMode::FourWay,
            other => {
                warn!("Invalid direction mode {}, using 4-way", other);
                DirectionMode::FourWay
            }
        }
    }
}

impl From<DirectionMode> for u8 {
    fn from(mode: DirectionMode) -> Self {
        match mode {
            DirectionMode::FourWay => 4,
            DirectionMode::EightWay => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickConfig {
    pub mode: StickMode,
    pub deadzone: u16,
    pub saturation: u16,
    pub sensitivity: u8,
    pub max_speed: u16,
    pub curve: ResponseCurve,
    pub direction_mode: DirectionMode,
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub scroll_sensitivity: u8,
    /// 0 means "same as `deadzone`".
    pub scroll_deadzone: u16,
}

impl Default for StickConfig {
    fn default() -> Self {
        Self::left_default()
    }
}

impl StickConfig {
    pub fn left_default() -> Self {
        Self {
            mode: StickMode::Mouse,
            deadzone: 8000,
            saturation: 32000,
            sensitivity: DEFAULT_SENSITIVITY,
            max_speed: DEFAULT_MAX_SPEED,
            curve: ResponseCurve::Square,
            direction_mode: DirectionMode::FourWay,
            up: KeyCode::UP,
            down: KeyCode::DOWN,
            left: KeyCode::LEFT,
            right: KeyCode::RIGHT,
            scroll_sensitivity: DEFAULT_SCROLL_SENSITIVITY,
            scroll_deadzone: 0,
        }
    }

    pub fn right_default() -> Self {
        Self {
            mode: StickMode::Scroll,
            deadzone: 8689,
            up: KeyCode::KEY_W,
            down: KeyCode::KEY_S,
            left: KeyCode::KEY_A,
            right: KeyCode::KEY_D,
            ..Self::left_default()
        }
    }

    /// Key codes indexed by direction bit position (up, down, left, right).
    pub fn direction_codes(&self) -> [KeyCode; 4] {
        [self.up, self.down, self.left, self.right]
    }

    pub fn effective_scroll_deadzone(&self) -> u16 {
        if self.scroll_deadzone == 0 {
            self.deadzone
        } else {
            self.scroll_deadzone
        }
    }

    fn sanitize(&mut self, name: &str) -> usize {
        let mut fixes = 0;

        if self.deadzone > MAX_AXIS {
            warn!("{}: deadzone {} clamped to {}", name, self.deadzone, MAX_AXIS);
            self.deadzone = MAX_AXIS;
            fixes += 1;
        }
        if self.saturation > MAX_AXIS {
            warn!("{}: saturation {} clamped to {}", name, self.saturation, MAX_AXIS);
            self.saturation = MAX_AXIS;
            fixes += 1;
        }
        if self.scroll_deadzone > MAX_AXIS {
            warn!("{}: scroll_deadzone {} clamped to {}", name, self.scroll_deadzone, MAX_AXIS);
            self.scroll_deadzone = MAX_AXIS;
            fixes += 1;
        }
        if !(1..=100).contains(&self.sensitivity) {
            warn!("{}: sensitivity {} reset to {}", name, self.sensitivity, DEFAULT_SENSITIVITY);
            self.sensitivity = DEFAULT_SENSITIVITY;
            fixes += 1;
        }
        if !(1..=100).contains(&self.scroll_sensitivity) {
            warn!(
                "{}: scroll_sensitivity {} reset to {}",
                name, self.scroll_sensitivity, DEFAULT_SCROLL_SENSITIVITY
            );
            self.scroll_sensitivity = DEFAULT_SCROLL_SENSITIVITY;
            fixes += 1;
        }
        if self.max_speed == 0 {
            warn!("{}: max_speed 0 reset to {}", name, DEFAULT_MAX_SPEED);
            self.max_speed = DEFAULT_MAX_SPEED;
            fixes += 1;
        }
        for (direction, code) in [
            ("up", &mut self.up),
            ("down", &mut self.down),
            ("left", &mut self.left),
            ("right", &mut self.right),
        ] {
            if !code.is_valid() {
                warn!("{}: invalid {} code {} disabled", name, direction, code);
                *code = KeyCode::DISABLED;
                fixes += 1;
            }
        }
        if self.saturation <= self.deadzone {
            // Left as is, the transforms turn this into "no motion".
            warn!(
                "{}: saturation {} <= deadzone {}, stick produces no motion",
                name, self.saturation, self.deadzone
            );
        }

        fixes
    }
}

/// Named form of the 16-entry button table, one field per canonical button bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonBindings {
    pub dpad_up: KeyCode,
    pub dpad_down: KeyCode,
    pub dpad_left: KeyCode,
    pub dpad_right: KeyCode,
    pub start: KeyCode,
    pub back: KeyCode,
    pub left_thumb: KeyCode,
    pub right_thumb: KeyCode,
    pub left_shoulder: KeyCode,
    pub right_shoulder: KeyCode,
    pub guide: KeyCode,
    /// Bit 11 is never set by stock pads. Disabled unless bound.
    pub reserved: KeyCode,
    pub a: KeyCode,
    pub b: KeyCode,
    pub x: KeyCode,
    pub y: KeyCode,
}

impl Default for ButtonBindings {
    fn default() -> Self {
        Self {
            dpad_up: KeyCode::UP,
            dpad_down: KeyCode::DOWN,
            dpad_left: KeyCode::LEFT,
            dpad_right: KeyCode::RIGHT,
            start: KeyCode::SPACE,
            back: KeyCode::TAB,
            left_thumb: KeyCode::LEFT_CTRL,
            right_thumb: KeyCode::LEFT_ALT,
            left_shoulder: KeyCode::PAGE_UP,
            right_shoulder: KeyCode::PAGE_DOWN,
            guide: KeyCode::LEFT_SHIFT,
            reserved: KeyCode::DISABLED,
            a: KeyCode::ENTER,
            b: KeyCode::ESCAPE,
            x: KeyCode::BACKSPACE,
            y: KeyCode::TAB,
        }
    }
}

impl ButtonBindings {
    pub fn code(&self, button: Button) -> KeyCode {
        match button {
            Button::DPadUp => self.dpad_up,
            Button::DPadDown => self.dpad_down,
            Button::DPadLeft => self.dpad_left,
            Button::DPadRight => self.dpad_right,
            Button::Start => self.start,
            Button::Back => self.back,
            Button::LeftThumb => self.left_thumb,
            Button::RightThumb => self.right_thumb,
            Button::LeftShoulder => self.left_shoulder,
            Button::RightShoulder => self.right_shoulder,
            Button::Guide => self.guide,
            Button::Reserved => self.reserved,
            Button::A => self.a,
            Button::B => self.b,
            Button::X => self.x,
            Button::Y => self.y,
        }
    }

    fn code_mut(&mut self, button: Button) -> &mut KeyCode {
        match button {
            Button::DPadUp => &mut self.dpad_up,
            Button::DPadDown => &mut self.dpad_down,
            Button::DPadLeft => &mut self.dpad_left,
            Button::DPadRight => &mut self.dpad_right,
            Button::Start => &mut self.start,
            Button::Back => &mut self.back,
            Button::LeftThumb => &mut self.left_thumb,
            Button::RightThumb => &mut self.right_thumb,
            Button::LeftShoulder => &mut self.left_shoulder,
            Button::RightShoulder => &mut self.right_shoulder,
            Button::Guide => &mut self.guide,
            Button::Reserved => &mut self.reserved,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::X => &mut self.x,
            Button::Y => &mut self.y,
        }
    }

    /// Table form indexed by button bit.
    pub fn to_table(&self) -> [KeyCode; 16] {
        Button::ALL.map(|button| self.code(button))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub trigger_threshold: u8,
    pub left_trigger: KeyCode,
    pub right_trigger: KeyCode,
    pub buttons: ButtonBindings,
    pub left_stick: StickConfig,
    pub right_stick: StickConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: DEFAULT_TRIGGER_THRESHOLD,
            left_trigger: KeyCode::MOUSE_RIGHT,
            right_trigger: KeyCode::MOUSE_LEFT,
            buttons: ButtonBindings::default(),
            left_stick: StickConfig::left_default(),
            right_stick: StickConfig::right_default(),
        }
    }
}

impl MappingConfig {
    /// Repairs out-of-range values in place and returns the number of fixes.
    pub fn sanitize(&mut self) -> usize {
        let mut fixes = 0;
        let defaults = MappingConfig::default();

        for button in Button::ALL {
            let code = self.buttons.code_mut(button);
            if !code.is_valid() {
                warn!("Button {:?}: invalid code {} disabled", button, code);
                *code = KeyCode::DISABLED;
                fixes += 1;
            }
        }

        if !self.left_trigger.is_valid() {
            warn!(
                "Left trigger: invalid code {} reset to {}",
                self.left_trigger, defaults.left_trigger
            );
            self.left_trigger = defaults.left_trigger;
            fixes += 1;
        }
        if !self.right_trigger.is_valid() {
            warn!(
                "Right trigger: invalid code {} reset to {}",
                self.right_trigger, defaults.right_trigger
            );
            self.right_trigger = defaults.right_trigger;
            fixes += 1;
        }

        fixes += self.left_stick.sanitize("left_stick");
        fixes += self.right_stick.sanitize("right_stick");
        fixes
    }
}
