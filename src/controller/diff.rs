//! Edge Diff Engine
//!
//! Compares two consecutive [`ControllerState`] snapshots and turns every
//! change into either a queued [`KeyTransition`] or a direct write into the
//! [`PointerTracker`].
//!
//! ```text
//!  old ─┐
//!       ├─► buttons ──┐
//!  new ─┤   triggers ─┼─► Binding::Key ───► TransitionSink (queue)
//!       │   keys-mode │   Binding::Mouse ─► PointerTracker
//!       │   sticks ───┘
//!       └─► mouse/scroll sticks (every report) ───► PointerTracker
//! ```
//!
//! Only one stick drives the pointer and only one drives the wheel. If both
//! sticks share a mode the left stick wins.

use super::report::{Button, ControllerState};
use super::response::{digital_direction, pointer_delta, scroll_delta};
use crate::mapping::codes::{Binding, KeyCode, MouseFunction};
use crate::mapping::config::{MappingConfig, StickConfig, StickMode};
use tracing::debug;

/// Raw key press or release produced by the diff engine or the repeat timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyTransition {
    pub code: u8,
    pub pressed: bool,
}

impl KeyTransition {
    pub fn press(code: u8) -> Self {
        Self {
            code,
            pressed: true,
        }
    }

    pub fn release(code: u8) -> Self {
        Self {
            code,
            pressed: false,
        }
    }
}

/// Receives key transitions from the diff engine.
pub trait TransitionSink {
    fn key_transition(&mut self, transition: KeyTransition);
}

impl TransitionSink for Vec<KeyTransition> {
    fn key_transition(&mut self, transition: KeyTransition) {
        self.push(transition);
    }
}

/// Snapshot handed to the pointer consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub relative_x: i32,
    pub relative_y: i32,
    pub relative_z: i32,
    pub left_button: bool,
    pub right_button: bool,
    pub middle_button: bool,
}

/// Pointer state owned by the session.
///
/// Stick deltas are assigned on every report and stay in place until the
/// next report, so a held stick keeps moving the pointer on every poll.
/// Wheel steps from scroll buttons are one-shot and consumed by [`read`](Self::read).
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    state: PointerState,
    wheel_steps: i32,
    changed: bool,
}

impl PointerTracker {
    pub fn set_motion(&mut self, dx: i32, dy: i32) {
        self.state.relative_x = dx;
        self.state.relative_y = dy;
    }

    pub fn set_wheel(&mut self, dz: i32) {
        self.state.relative_z = dz;
    }

    pub fn add_wheel_step(&mut self, step: i32) {
        self.wheel_steps += step;
        self.changed = true;
    }

    pub fn set_button(&mut self, function: MouseFunction, pressed: bool) {
        let button = match function {
            MouseFunction::Left => &mut self.state.left_button,
            MouseFunction::Right => &mut self.state.right_button,
            MouseFunction::Middle => &mut self.state.middle_button,
            MouseFunction::ScrollUp | MouseFunction::ScrollDown => return,
        };
        if *button != pressed {
            *button = pressed;
            self.changed = true;
        }
    }

    pub fn has_update(&self) -> bool {
        self.changed
            || self.wheel_steps != 0
            || self.state.relative_x != 0
            || self.state.relative_y != 0
            || self.state.relative_z != 0
    }

    /// Current snapshot, or `None` when nothing moved or changed since the last read.
    pub fn read(&mut self) -> Option<PointerState> {
        if !self.has_update() {
            return None;
        }
        let mut snapshot = self.state;
        snapshot.relative_z += self.wheel_steps;
        self.wheel_steps = 0;
        self.changed = false;
        Some(snapshot)
    }

    pub fn peek(&self) -> PointerState {
        self.state
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Counts of what one diff produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub queued: usize,
    pub pointer_writes: usize,
}

struct Emitter<'a, S: TransitionSink> {
    sink: &'a mut S,
    pointer: &'a mut PointerTracker,
    summary: DiffSummary,
}

impl<S: TransitionSink> Emitter<'_, S> {
    fn emit(&mut self, code: KeyCode, pressed: bool) {
        match code.binding() {
            Binding::Disabled => {}
            Binding::Key(usage) => {
                self.sink.key_transition(KeyTransition {
                    code: usage,
                    pressed,
                });
                self.summary.queued += 1;
            }
            Binding::Mouse(function @ (MouseFunction::ScrollUp | MouseFunction::ScrollDown)) => {
                if pressed {
                    let step = if function == MouseFunction::ScrollUp {
                        -1
                    } else {
                        1
                    };
                    self.pointer.add_wheel_step(step);
                    self.summary.pointer_writes += 1;
                }
            }
            Binding::Mouse(function) => {
                self.pointer.set_button(function, pressed);
                self.summary.pointer_writes += 1;
            }
        }
    }

    fn direction_changes(&mut self, old: (i16, i16), new: (i16, i16), cfg: &StickConfig) {
        let old_mask = digital_direction(old.0, old.1, cfg);
        let new_mask = digital_direction(new.0, new.1, cfg);
        let flipped = old_mask ^ new_mask;
        if flipped == 0 {
            return;
        }
        for (bit, code) in cfg.direction_codes().into_iter().enumerate() {
            let mask = 1u8 << bit;
            if flipped & mask != 0 {
                self.emit(code, new_mask & mask != 0);
            }
        }
    }
}

/// Applies the changes between `old` and `new` to the sink and the pointer.
pub fn diff_states<S: TransitionSink>(
    old: &ControllerState,
    new: &ControllerState,
    cfg: &MappingConfig,
    sink: &mut S,
    pointer: &mut PointerTracker,
) -> DiffSummary {
    let mut emitter = Emitter {
        sink,
        pointer,
        summary: DiffSummary::default(),
    };

    let changed = old.buttons ^ new.buttons;
    if changed != 0 {
        for button in Button::ALL {
            if changed & button.mask() != 0 {
                emitter.emit(cfg.buttons.code(button), new.is_pressed(button));
            }
        }
    }

    let (old_left, old_right) = old.triggers_active(cfg.trigger_threshold);
    let (new_left, new_right) = new.triggers_active(cfg.trigger_threshold);
    if old_left != new_left {
        emitter.emit(cfg.left_trigger, new_left);
    }
    if old_right != new_right {
        emitter.emit(cfg.right_trigger, new_right);
    }

    if cfg.left_stick.mode == StickMode::Keys {
        emitter.direction_changes(old.left_stick(), new.left_stick(), &cfg.left_stick);
    }
    if cfg.right_stick.mode == StickMode::Keys {
        emitter.direction_changes(old.right_stick(), new.right_stick(), &cfg.right_stick);
    }

    if let Some(((x, y), stick)) = active_stick(new, cfg, StickMode::Mouse) {
        let (dx, dy) = pointer_delta(x, y, stick);
        emitter.pointer.set_motion(dx, dy);
        emitter.summary.pointer_writes += 1;
    }
    if let Some(((_, y), stick)) = active_stick(new, cfg, StickMode::Scroll) {
        emitter.pointer.set_wheel(scroll_delta(y, stick));
        emitter.summary.pointer_writes += 1;
    }

    let summary = emitter.summary;
    if summary.queued > 0 {
        debug!("Diff queued {} key transitions", summary.queued);
    }
    summary
}

/// First stick (left before right) configured for `mode`.
fn active_stick<'a>(
    state: &ControllerState,
    cfg: &'a MappingConfig,
    mode: StickMode,
) -> Option<((i16, i16), &'a StickConfig)> {
    if cfg.left_stick.mode == mode {
        Some((state.left_stick(), &cfg.left_stick))
    } else if cfg.right_stick.mode == mode {
        Some((state.right_stick(), &cfg.right_stick))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::response::DIRECTION_UP;
    use crate::mapping::config::DirectionMode;

    fn keys_only_config() -> MappingConfig {
        let mut cfg = MappingConfig::default();
        cfg.left_stick.mode = StickMode::Disabled;
        cfg.right_stick.mode = StickMode::Disabled;
        cfg
    }

    fn run(old: &ControllerState, new: &ControllerState, cfg: &MappingConfig) -> (Vec<KeyTransition>, PointerTracker) {
        let mut sink = Vec::new();
        let mut pointer = PointerTracker::default();
        diff_states(old, new, cfg, &mut sink, &mut pointer);
        (sink, pointer)
    }

    #[test]
    fn emits_exactly_the_flipped_buttons() {
        // Every button bound to a distinct key.
        let mut cfg = keys_only_config();
        let codes: Vec<KeyCode> = (0..16).map(|i| KeyCode(0x04 + i)).collect();
        cfg.buttons.dpad_up = codes[0];
        cfg.buttons.dpad_down = codes[1];
        cfg.buttons.dpad_left = codes[2];
        cfg.buttons.dpad_right = codes[3];
        cfg.buttons.start = codes[4];
        cfg.buttons.back = codes[5];
        cfg.buttons.left_thumb = codes[6];
        cfg.buttons.right_thumb = codes[7];
        cfg.buttons.left_shoulder = codes[8];
        cfg.buttons.right_shoulder = codes[9];
        cfg.buttons.guide = codes[10];
        cfg.buttons.a = codes[12];
        cfg.buttons.b = codes[13];
        cfg.buttons.x = codes[14];
        cfg.buttons.y = codes[15];

        let masks = [0x0000u16, 0xFFFF, 0x1010, 0x0F0F, 0xA5A5, 0x8001, 0x7FFE];
        for &old_mask in &masks {
            for &new_mask in &masks {
                let old = ControllerState {
                    buttons: old_mask,
                    ..Default::default()
                };
                let new = ControllerState {
                    buttons: new_mask,
                    ..Default::default()
                };
                let (emitted, _) = run(&old, &new, &cfg);

                let expected: Vec<KeyTransition> = (0..16u8)
                    .filter(|bit| bit != &11 && (old_mask ^ new_mask) & (1 << bit) != 0)
                    .map(|bit| KeyTransition {
                        code: 0x04 + bit,
                        pressed: new_mask & (1 << bit) != 0,
                    })
                    .collect();
                assert_eq!(emitted, expected, "{old_mask:#06x} -> {new_mask:#06x}");
            }
        }
    }

    #[test]
    fn identical_states_emit_nothing() {
        let cfg = keys_only_config();
        let state = ControllerState {
            buttons: 0x1010,
            left_trigger: 200,
            ..Default::default()
        };
        let (emitted, mut pointer) = run(&state, &state, &cfg);
        assert!(emitted.is_empty());
        assert_eq!(pointer.read(), None);
    }

    #[test]
    fn mouse_buttons_bypass_the_queue() {
        let mut cfg = keys_only_config();
        cfg.buttons.a = KeyCode::MOUSE_LEFT;
        cfg.buttons.b = KeyCode::MOUSE_MIDDLE;
        let old = ControllerState::default();
        let new = ControllerState {
            buttons: Button::A.mask() | Button::B.mask(),
            ..Default::default()
        };
        let (emitted, mut pointer) = run(&old, &new, &cfg);
        assert!(emitted.is_empty());
        let state = pointer.read().unwrap();
        assert!(state.left_button);
        assert!(state.middle_button);
        assert!(!state.right_button);
        assert_eq!(pointer.read(), None);
    }

    #[test]
    fn scroll_buttons_produce_one_wheel_step() {
        let mut cfg = keys_only_config();
        cfg.buttons.y = KeyCode::SCROLL_UP;
        let old = ControllerState::default();
        let new = ControllerState {
            buttons: Button::Y.mask(),
            ..Default::default()
        };
        let mut sink = Vec::new();
        let mut pointer = PointerTracker::default();
        diff_states(&old, &new, &cfg, &mut sink, &mut pointer);
        assert_eq!(pointer.read().map(|p| p.relative_z), Some(-1));
        assert_eq!(pointer.read(), None);

        // Release does not scroll.
        diff_states(&new, &old, &cfg, &mut sink, &mut pointer);
        assert_eq!(pointer.read(), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn triggers_flip_on_threshold() {
        let mut cfg = keys_only_config();
        cfg.left_trigger = KeyCode::LEFT_SHIFT;
        let below = ControllerState {
            left_trigger: 128,
            right_trigger: 10,
            ..Default::default()
        };
        let above = ControllerState {
            left_trigger: 129,
            right_trigger: 255,
            ..Default::default()
        };

        let (emitted, mut pointer) = run(&below, &above, &cfg);
        assert_eq!(emitted, vec![KeyTransition::press(0xE1)]);
        assert!(pointer.read().unwrap().left_button);

        let (emitted, _) = run(&above, &below, &cfg);
        assert_eq!(emitted, vec![KeyTransition::release(0xE1)]);
    }

    #[test]
    fn keys_mode_stick_emits_direction_edges() {
        let mut cfg = keys_only_config();
        cfg.left_stick.mode = StickMode::Keys;
        cfg.left_stick.direction_mode = DirectionMode::EightWay;

        let centered = ControllerState::default();
        let up_right = ControllerState {
            left_x: 20000,
            left_y: 20000,
            ..Default::default()
        };
        let up = ControllerState {
            left_x: 0,
            left_y: 20000,
            ..Default::default()
        };

        let (emitted, _) = run(&centered, &up_right, &cfg);
        assert_eq!(
            emitted,
            vec![KeyTransition::press(0x52), KeyTransition::press(0x4F)]
        );

        let (emitted, _) = run(&up_right, &up, &cfg);
        assert_eq!(emitted, vec![KeyTransition::release(0x4F)]);
        assert_eq!(digital_direction(0, 20000, &cfg.left_stick), DIRECTION_UP);

        let (emitted, _) = run(&up, &centered, &cfg);
        assert_eq!(emitted, vec![KeyTransition::release(0x52)]);
    }

    #[test]
    fn mouse_stick_writes_deltas_every_report() {
        let cfg = MappingConfig::default();
        let pushed = ControllerState {
            left_x: 32000,
            ..Default::default()
        };
        let (emitted, mut pointer) = run(&pushed, &pushed, &cfg);
        assert!(emitted.is_empty());
        let state = pointer.read().unwrap();
        assert_eq!((state.relative_x, state.relative_y), (10, 0));
        // Held stick keeps reporting motion.
        assert_eq!(pointer.read().map(|p| p.relative_x), Some(10));
    }

    #[test]
    fn scroll_stick_writes_wheel() {
        let cfg = MappingConfig::default();
        let pushed = ControllerState {
            right_y: 32000,
            ..Default::default()
        };
        let (_, mut pointer) = run(&ControllerState::default(), &pushed, &cfg);
        assert_eq!(pointer.read().map(|p| p.relative_z), Some(-10));
    }

    #[test]
    fn left_stick_wins_when_both_sticks_share_a_mode() {
        // Known limitation: only one stick per mode drives the pointer.
        let mut cfg = MappingConfig::default();
        cfg.right_stick = cfg.left_stick.clone();
        let state = ControllerState {
            left_x: 0,
            right_x: 32000,
            right_y: 32000,
            ..Default::default()
        };
        let (_, mut pointer) = run(&ControllerState::default(), &state, &cfg);
        assert_eq!(pointer.read(), None);

        let state = ControllerState {
            left_x: -32000,
            right_x: 32000,
            ..Default::default()
        };
        let (_, mut pointer) = run(&ControllerState::default(), &state, &cfg);
        assert_eq!(pointer.read().map(|p| p.relative_x), Some(-10));
    }
}
