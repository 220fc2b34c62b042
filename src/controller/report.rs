//! Report Normalizer
//!
//! Bringt die Rohdaten der unterstützten Geräte in ein einheitliches Format.
//!
//! ```text
//! Xbox360 report (>= 14 bytes)         AllyX report (16 bytes, or 17 with id 0x0B)
//! ┌────┬────┬─────────┬──────┬──────┐  ┌──────────────┬─────────────┬────────────┐
//! │ 0  │ 1  │ 2..4    │ 4..6 │ 6..14│  │ 0..8         │ 8..12       │ 12..16     │
//! │type│len │ buttons │ trig │ axes │  │ 4x u16 stick │ 2x u16 trig │ buttons[4] │
//! └────┴────┴─────────┴──────┴──────┘  └──────────────┴─────────────┴────────────┘
//!                  │                                  │
//!                  └──────────────► ControllerState ◄─┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const GENERIC_REPORT_LEN: usize = 14;
pub const ALLY_REPORT_ID: u8 = 0x0B;
pub const ALLY_REPORT_LEN: usize = 16;

/// Which normalization path a device's reports take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Xbox360,
    AllyX,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Xbox360 => write!(f, "Xbox 360"),
            DeviceKind::AllyX => write!(f, "ROG Ally X"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Malformed {kind} report ({len} bytes)")]
    Malformed { kind: DeviceKind, len: usize },
}

/// Canonical button bits of the 16-bit button mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    DPadUp = 0,
    DPadDown = 1,
    DPadLeft = 2,
    DPadRight = 3,
    Start = 4,
    Back = 5,
    LeftThumb = 6,
    RightThumb = 7,
    LeftShoulder = 8,
    RightShoulder = 9,
    Guide = 10,
    Reserved = 11,
    A = 12,
    B = 13,
    X = 14,
    Y = 15,
}

impl Button {
    pub const ALL: [Button; 16] = [
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
        Button::Start,
        Button::Back,
        Button::LeftThumb,
        Button::RightThumb,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::Guide,
        Button::Reserved,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
    ];

    pub const fn mask(self) -> u16 {
        1 << self as u16
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Device-agnostic snapshot of one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
}

impl ControllerState {
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn left_stick(&self) -> (i16, i16) {
        (self.left_x, self.left_y)
    }

    pub fn right_stick(&self) -> (i16, i16) {
        (self.right_x, self.right_y)
    }

    /// Trigger activation as seen by the diff engine: strictly above the threshold.
    pub fn triggers_active(&self, threshold: u8) -> (bool, bool) {
        (self.left_trigger > threshold, self.right_trigger > threshold)
    }
}

/// Normalizes a raw report of the given device kind.
pub fn normalize(kind: DeviceKind, data: &[u8]) -> Result<ControllerState, ReportError> {
    match kind {
        DeviceKind::Xbox360 => parse_generic(data),
        DeviceKind::AllyX => parse_ally(data),
    }
}

fn le_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn le_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

fn parse_generic(data: &[u8]) -> Result<ControllerState, ReportError> {
    if data.len() < GENERIC_REPORT_LEN {
        return Err(ReportError::Malformed {
            kind: DeviceKind::Xbox360,
            len: data.len(),
        });
    }

    Ok(ControllerState {
        buttons: le_u16(data, 2),
        left_trigger: data[4],
        right_trigger: data[5],
        left_x: le_i16(data, 6),
        left_y: le_i16(data, 8),
        right_x: le_i16(data, 10),
        right_y: le_i16(data, 12),
    })
}

// AllyX Buttons[0]
const ALLY_A: u8 = 1 << 0;
const ALLY_B: u8 = 1 << 1;
const ALLY_X: u8 = 1 << 2;
const ALLY_Y: u8 = 1 << 3;
const ALLY_LB: u8 = 1 << 4;
const ALLY_RB: u8 = 1 << 5;
const ALLY_VIEW: u8 = 1 << 6;
const ALLY_MENU: u8 = 1 << 7;
// AllyX Buttons[1]
const ALLY_L3: u8 = 1 << 0;
const ALLY_R3: u8 = 1 << 1;
const ALLY_MODE: u8 = 1 << 2;

fn parse_ally(data: &[u8]) -> Result<ControllerState, ReportError> {
    let body = match data.len() {
        ALLY_REPORT_LEN => data,
        len if len == ALLY_REPORT_LEN + 1 && data[0] == ALLY_REPORT_ID => &data[1..],
        len => {
            return Err(ReportError::Malformed {
                kind: DeviceKind::AllyX,
                len,
            })
        }
    };

    let stick = |offset: usize| (i32::from(le_u16(body, offset)) - 32768) as i16;
    let trigger = |offset: usize| (le_u16(body, offset) >> 2).min(0xFF) as u8;

    let face = body[12];
    let extra = body[13];
    let mut buttons = hat_to_dpad(body[14]);

    let pairs: [(u8, u8, Button); 11] = [
        (face, ALLY_A, Button::A),
        (face, ALLY_B, Button::B),
        (face, ALLY_X, Button::X),
        (face, ALLY_Y, Button::Y),
        (face, ALLY_LB, Button::LeftShoulder),
        (face, ALLY_RB, Button::RightShoulder),
        (face, ALLY_VIEW, Button::Back),
        (face, ALLY_MENU, Button::Start),
        (extra, ALLY_L3, Button::LeftThumb),
        (extra, ALLY_R3, Button::RightThumb),
        (extra, ALLY_MODE, Button::Guide),
    ];
    for (byte, bit, button) in pairs {
        if byte & bit != 0 {
            buttons |= button.mask();
        }
    }

    Ok(ControllerState {
        buttons,
        left_trigger: trigger(8),
        right_trigger: trigger(10),
        left_x: stick(0),
        left_y: stick(2),
        right_x: stick(4),
        right_y: stick(6),
    })
}

/// Hat switch (clockwise from 1 = up, 0 = neutral) to D-pad bits.
pub fn hat_to_dpad(hat: u8) -> u16 {
    let up = Button::DPadUp.mask();
    let down = Button::DPadDown.mask();
    let left = Button::DPadLeft.mask();
    let right = Button::DPadRight.mask();
    match hat {
        1 => up,
        2 => up | right,
        3 => right,
        4 => down | right,
        5 => down,
        6 => down | left,
        7 => left,
        8 => up | left,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic_report(buttons: u16, lt: u8, rt: u8, axes: [i16; 4]) -> Vec<u8> {
        let mut data = vec![0x00, 0x14];
        data.extend_from_slice(&buttons.to_le_bytes());
        data.push(lt);
        data.push(rt);
        for axis in axes {
            data.extend_from_slice(&axis.to_le_bytes());
        }
        data.extend_from_slice(&[0; 6]);
        data
    }

    fn ally_report(sticks: [u16; 4], triggers: [u16; 2], buttons: [u8; 4]) -> Vec<u8> {
        let mut data = Vec::with_capacity(ALLY_REPORT_LEN);
        for v in sticks.iter().chain(triggers.iter()) {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&buttons);
        data
    }

    #[test]
    fn generic_report_decodes_button_mask_0x1010() {
        let state = normalize(DeviceKind::Xbox360, &generic_report(0x1010, 0, 0, [0; 4])).unwrap();
        assert_eq!(state.buttons, 0x1010);
        assert!(state.is_pressed(Button::A));
        assert!(state.is_pressed(Button::Start));
        assert_eq!((state.left_trigger, state.right_trigger), (0, 0));
        assert_eq!(state.left_stick(), (0, 0));
        assert_eq!(state.right_stick(), (0, 0));
    }

    #[test]
    fn generic_report_reads_signed_axes() {
        let data = generic_report(0, 12, 250, [-32768, 32767, -1, 1000]);
        let state = normalize(DeviceKind::Xbox360, &data).unwrap();
        assert_eq!(state.left_trigger, 12);
        assert_eq!(state.right_trigger, 250);
        assert_eq!(state.left_stick(), (-32768, 32767));
        assert_eq!(state.right_stick(), (-1, 1000));
    }

    #[test]
    fn short_generic_report_is_malformed() {
        let err = normalize(DeviceKind::Xbox360, &[0u8; 13]).unwrap_err();
        assert_eq!(
            err,
            ReportError::Malformed {
                kind: DeviceKind::Xbox360,
                len: 13
            }
        );
    }

    #[test]
    fn ally_hat_up_right_sets_two_bits() {
        let data = ally_report([32768; 4], [0, 0], [0, 0, 2, 0]);
        let state = normalize(DeviceKind::AllyX, &data).unwrap();
        assert_eq!(
            state.buttons,
            Button::DPadUp.mask() | Button::DPadRight.mask()
        );
    }

    #[test]
    fn every_hat_value_maps_to_adjacent_bits() {
        let up = Button::DPadUp.mask();
        let down = Button::DPadDown.mask();
        for hat in 0..=8u8 {
            let bits = hat_to_dpad(hat);
            assert!(bits & (up | down) != up | down, "hat {hat} sets up and down");
            let expected_bits = match hat {
                0 => 0,
                h if h % 2 == 0 => 2,
                _ => 1,
            };
            assert_eq!(bits.count_ones(), expected_bits, "hat {hat}");
        }
        assert_eq!(hat_to_dpad(9), 0);
        assert_eq!(hat_to_dpad(0x0F), 0);
    }

    #[test]
    fn ally_axes_and_triggers_are_rescaled() {
        let data = ally_report([0, 65535, 32768, 32767], [1023, 3], [0; 4]);
        let state = normalize(DeviceKind::AllyX, &data).unwrap();
        assert_eq!(state.left_x, -32768);
        assert_eq!(state.left_y, 32767);
        assert_eq!(state.right_x, 0);
        assert_eq!(state.right_y, -1);
        assert_eq!(state.left_trigger, 255);
        assert_eq!(state.right_trigger, 0);
    }

    #[test]
    fn ally_buttons_map_to_canonical_bits() {
        let data = ally_report([32768; 4], [0, 0], [0xFF, 0x07, 0, 0]);
        let state = normalize(DeviceKind::AllyX, &data).unwrap();
        for button in Button::ALL {
            let expected = !matches!(
                button,
                Button::DPadUp
                    | Button::DPadDown
                    | Button::DPadLeft
                    | Button::DPadRight
                    | Button::Reserved
            );
            assert_eq!(state.is_pressed(button), expected, "{button:?}");
        }
    }

    #[test]
    fn ally_accepts_leading_report_id() {
        let mut data = vec![ALLY_REPORT_ID];
        data.extend(ally_report([32768; 4], [0, 0], [ALLY_A, 0, 5, 0]));
        let state = normalize(DeviceKind::AllyX, &data).unwrap();
        assert!(state.is_pressed(Button::A));
        assert!(state.is_pressed(Button::DPadDown));
    }

    #[test]
    fn ally_rejects_other_framings() {
        let mut wrong_id = vec![0x0C];
        wrong_id.extend(ally_report([32768; 4], [0, 0], [0; 4]));
        assert!(normalize(DeviceKind::AllyX, &wrong_id).is_err());
        assert!(normalize(DeviceKind::AllyX, &[0u8; 15]).is_err());
        assert!(normalize(DeviceKind::AllyX, &[0u8; 18]).is_err());
    }
}
