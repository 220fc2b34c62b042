//! Response Transform
//!
//! Pure functions that turn one stick's axis pair into a direction mask,
//! a pointer delta or a scroll step. All math is integer fixed point on a
//! 0..=10000 domain. A config with `saturation <= deadzone` produces no
//! motion at all.

use crate::mapping::config::{DirectionMode, ResponseCurve, StickConfig};

pub const CURVE_SCALE: i32 = 10000;

/// 8-way threshold, roughly sin(22.5°) of full scale.
pub const EIGHT_WAY_THRESHOLD: i32 = 12500;

pub const DIRECTION_UP: u8 = 1 << 0;
pub const DIRECTION_DOWN: u8 = 1 << 1;
pub const DIRECTION_LEFT: u8 = 1 << 2;
pub const DIRECTION_RIGHT: u8 = 1 << 3;

pub const SCROLL_MIN_STEP: i32 = 1;
pub const SCROLL_MAX_STEP: i32 = 10;

/// Shapes a normalized magnitude. Input and output are in `0..=CURVE_SCALE`.
pub fn response_curve(t: i32, curve: ResponseCurve) -> i32 {
    if t <= 0 {
        return 0;
    }
    if t >= CURVE_SCALE {
        return CURVE_SCALE;
    }

    let shaped = match curve {
        ResponseCurve::Linear => t,
        ResponseCurve::Square => t * t / CURVE_SCALE,
        ResponseCurve::Smoothstep => {
            // Single division at the end keeps the rounding monotonic.
            let t = i64::from(t);
            let scale = i64::from(CURVE_SCALE);
            let value = (3 * t * t * scale - 2 * t * t * t) / (scale * scale);
            value as i32
        }
    };
    shaped.clamp(0, CURVE_SCALE)
}

fn magnitude(x: i16, y: i16) -> i32 {
    i32::from(x).abs().max(i32::from(y).abs())
}

fn is_degenerate(cfg: &StickConfig) -> bool {
    cfg.saturation <= cfg.deadzone
}

/// Maps (mag - deadzone) onto `0..=scale`, with mag already clamped to saturation.
fn normalize(mag: i32, deadzone: i32, saturation: i32, scale: i32) -> i32 {
    let mag = mag.min(saturation);
    (mag - deadzone) * scale / (saturation - deadzone)
}

/// Digital direction mask (`DIRECTION_*` bits) for one stick.
pub fn digital_direction(x: i16, y: i16, cfg: &StickConfig) -> u8 {
    let deadzone = i32::from(cfg.deadzone);
    if is_degenerate(cfg) || magnitude(x, y) < deadzone {
        return 0;
    }

    let x = i32::from(x);
    let y = i32::from(y);
    let mut mask = 0;

    match cfg.direction_mode {
        DirectionMode::EightWay => {
            if y > EIGHT_WAY_THRESHOLD {
                mask |= DIRECTION_UP;
            } else if y < -EIGHT_WAY_THRESHOLD {
                mask |= DIRECTION_DOWN;
            }
            if x > EIGHT_WAY_THRESHOLD {
                mask |= DIRECTION_RIGHT;
            } else if x < -EIGHT_WAY_THRESHOLD {
                mask |= DIRECTION_LEFT;
            }
        }
        DirectionMode::FourWay => {
            if x.abs() > y.abs() {
                if x > deadzone {
                    mask |= DIRECTION_RIGHT;
                } else if x < -deadzone {
                    mask |= DIRECTION_LEFT;
                }
            } else if y > deadzone {
                mask |= DIRECTION_UP;
            } else if y < -deadzone {
                mask |= DIRECTION_DOWN;
            }
        }
    }

    mask
}

/// Relative pointer movement for one stick. Stick up moves the pointer up (negative dy).
pub fn pointer_delta(x: i16, y: i16, cfg: &StickConfig) -> (i32, i32) {
    let deadzone = i32::from(cfg.deadzone);
    let saturation = i32::from(cfg.saturation);
    let mag = magnitude(x, y);
    if is_degenerate(cfg) || mag < deadzone {
        return (0, 0);
    }

    let normalized = normalize(mag, deadzone, saturation, CURVE_SCALE);
    let curved = response_curve(normalized, cfg.curve);

    let mut speed = (i64::from(curved) * i64::from(cfg.sensitivity) * i64::from(cfg.max_speed)
        / (i64::from(CURVE_SCALE) * 100)) as i32;
    if speed == 0 && curved > 0 {
        speed = 1;
    }

    let x = i32::from(x);
    let y = i32::from(y);
    let abs_x = x.abs();
    let abs_y = y.abs();

    if abs_x > abs_y {
        let dx = if x > 0 { speed } else { -speed };
        let dy = speed * abs_y / abs_x;
        (dx, if y > 0 { -dy } else { dy })
    } else {
        let dy = if y > 0 { -speed } else { speed };
        let dx = if abs_y > 0 { speed * abs_x / abs_y } else { 0 };
        (if x < 0 { -dx } else { dx }, dy)
    }
}

/// Wheel step for one stick's Y axis. Negative scrolls up.
pub fn scroll_delta(y: i16, cfg: &StickConfig) -> i32 {
    let deadzone = i32::from(cfg.effective_scroll_deadzone());
    let saturation = i32::from(cfg.saturation);
    let abs_y = i32::from(y).abs();
    if is_degenerate(cfg) || saturation <= deadzone || abs_y < deadzone {
        return 0;
    }

    let normalized = normalize(abs_y, deadzone, saturation, 100);
    let delta = (normalized * i32::from(cfg.scroll_sensitivity) / 100)
        .clamp(SCROLL_MIN_STEP, SCROLL_MAX_STEP);

    if y > 0 {
        -delta
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::config::StickConfig;

    const CURVES: [ResponseCurve; 3] = [
        ResponseCurve::Linear,
        ResponseCurve::Square,
        ResponseCurve::Smoothstep,
    ];

    fn stick(deadzone: u16, saturation: u16) -> StickConfig {
        StickConfig {
            deadzone,
            saturation,
            ..StickConfig::left_default()
        }
    }

    #[test]
    fn curves_are_monotonic_and_fix_endpoints() {
        for curve in CURVES {
            assert_eq!(response_curve(0, curve), 0);
            assert_eq!(response_curve(CURVE_SCALE, curve), CURVE_SCALE);
            let mut previous = 0;
            for t in 0..=CURVE_SCALE {
                let value = response_curve(t, curve);
                assert!(value >= previous, "{curve:?} drops at t={t}");
                assert!((0..=CURVE_SCALE).contains(&value));
                previous = value;
            }
        }
    }

    #[test]
    fn curves_clamp_out_of_domain_input() {
        for curve in CURVES {
            assert_eq!(response_curve(-50, curve), 0);
            assert_eq!(response_curve(CURVE_SCALE + 1, curve), CURVE_SCALE);
        }
        assert_eq!(response_curve(5000, ResponseCurve::Square), 2500);
        assert_eq!(response_curve(5000, ResponseCurve::Smoothstep), 5000);
    }

    #[test]
    fn inside_deadzone_yields_nothing() {
        let mut cfg = stick(8000, 32000);
        for mode in [DirectionMode::FourWay, DirectionMode::EightWay] {
            cfg.direction_mode = mode;
            for x in (-7999..8000).step_by(307) {
                for y in (-7999..8000).step_by(419) {
                    assert_eq!(pointer_delta(x, y, &cfg), (0, 0));
                    assert_eq!(digital_direction(x, y, &cfg), 0);
                }
            }
        }
        assert_eq!(scroll_delta(7999, &cfg), 0);
        assert_eq!(scroll_delta(-7999, &cfg), 0);
    }

    #[test]
    fn degenerate_config_never_moves() {
        for (deadzone, saturation) in [(8000, 8000), (20000, 1000), (0, 0)] {
            let mut cfg = stick(deadzone, saturation);
            for mode in [DirectionMode::FourWay, DirectionMode::EightWay] {
                cfg.direction_mode = mode;
                for x in (i16::MIN..=i16::MAX).step_by(4099) {
                    for y in (i16::MIN..=i16::MAX).step_by(3001) {
                        assert_eq!(pointer_delta(x, y, &cfg), (0, 0));
                        assert_eq!(digital_direction(x, y, &cfg), 0);
                        assert_eq!(scroll_delta(y, &cfg), 0);
                    }
                }
            }
        }
    }

    #[test]
    fn four_way_picks_dominant_axis() {
        let cfg = stick(8000, 32000);
        assert_eq!(digital_direction(20000, 10000, &cfg), DIRECTION_RIGHT);
        assert_eq!(digital_direction(-20000, 10000, &cfg), DIRECTION_LEFT);
        assert_eq!(digital_direction(5000, 20000, &cfg), DIRECTION_UP);
        assert_eq!(digital_direction(5000, -20000, &cfg), DIRECTION_DOWN);
        // Tie goes to the Y axis.
        assert_eq!(digital_direction(15000, 15000, &cfg), DIRECTION_UP);
    }

    #[test]
    fn eight_way_allows_diagonals_only() {
        let mut cfg = stick(8000, 32000);
        cfg.direction_mode = DirectionMode::EightWay;
        assert_eq!(
            digital_direction(20000, 20000, &cfg),
            DIRECTION_UP | DIRECTION_RIGHT
        );
        assert_eq!(
            digital_direction(-20000, -20000, &cfg),
            DIRECTION_DOWN | DIRECTION_LEFT
        );
        assert_eq!(digital_direction(20000, 9000, &cfg), DIRECTION_RIGHT);

        for x in (i16::MIN..=i16::MAX).step_by(1021) {
            for y in (i16::MIN..=i16::MAX).step_by(1031) {
                let mask = digital_direction(x, y, &cfg);
                assert_ne!(mask & (DIRECTION_UP | DIRECTION_DOWN), DIRECTION_UP | DIRECTION_DOWN);
                assert_ne!(
                    mask & (DIRECTION_LEFT | DIRECTION_RIGHT),
                    DIRECTION_LEFT | DIRECTION_RIGHT
                );
            }
        }
    }

    #[test]
    fn pointer_moves_up_when_stick_is_pushed_up() {
        let cfg = stick(8000, 32000);
        let (dx, dy) = pointer_delta(0, 32000, &cfg);
        assert_eq!(dx, 0);
        assert_eq!(dy, -10);

        let (dx, dy) = pointer_delta(0, -32000, &cfg);
        assert_eq!((dx, dy), (0, 10));
    }

    #[test]
    fn pointer_splits_diagonal_proportionally() {
        let cfg = stick(8000, 32000);
        let (dx, dy) = pointer_delta(32000, -16000, &cfg);
        assert_eq!(dx, 10);
        assert_eq!(dy, 5);

        let (dx, dy) = pointer_delta(-16000, 32000, &cfg);
        assert_eq!(dx, -5);
        assert_eq!(dy, -10);
    }

    #[test]
    fn pointer_has_minimum_step_past_deadzone() {
        let cfg = stick(8000, 32000);
        let (dx, dy) = pointer_delta(8300, 0, &cfg);
        assert_eq!((dx, dy), (1, 0));
    }

    #[test]
    fn scroll_is_inverted_and_bounded() {
        let cfg = StickConfig::right_default();
        assert_eq!(scroll_delta(32767, &cfg), -SCROLL_MAX_STEP);
        assert_eq!(scroll_delta(-32767, &cfg), SCROLL_MAX_STEP);
        assert_eq!(scroll_delta(9000, &cfg), -SCROLL_MIN_STEP);

        let mut strong = cfg.clone();
        strong.scroll_sensitivity = 100;
        assert_eq!(scroll_delta(-32000, &strong), SCROLL_MAX_STEP);
    }

    #[test]
    fn scroll_uses_its_own_deadzone_when_set() {
        let mut cfg = StickConfig::right_default();
        cfg.scroll_deadzone = 2000;
        assert_eq!(scroll_delta(-3000, &cfg), SCROLL_MIN_STEP);
        cfg.scroll_deadzone = 0;
        assert_eq!(scroll_delta(-3000, &cfg), 0);
    }
}
