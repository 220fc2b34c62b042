use padbridge::config::AppConfig;
use padbridge::controller::report::{Button, DeviceKind, ALLY_REPORT_ID};
use padbridge::keyboard::layout::BuiltinLayout;
use padbridge::keyboard::scan::SCAN_ESC;
use padbridge::keyboard::translator::{ShiftState, TranslateError};
use padbridge::session::{Context, DeviceSession};
use std::path::Path;

fn xbox_report(buttons: u16, triggers: (u8, u8), left: (i16, i16), right: (i16, i16)) -> Vec<u8> {
    let mut data = vec![0x00, 0x14];
    data.extend_from_slice(&buttons.to_le_bytes());
    data.push(triggers.0);
    data.push(triggers.1);
    for axis in [left.0, left.1, right.0, right.1] {
        data.extend_from_slice(&axis.to_le_bytes());
    }
    data.extend_from_slice(&[0; 6]);
    data
}

fn buttons(pressed: &[Button]) -> u16 {
    pressed.iter().fold(0, |mask, b| mask | b.mask())
}

fn session_from_toml(text: &str, kind: DeviceKind) -> DeviceSession {
    let mut config = AppConfig::from_toml_str(text, Path::new("pipeline.toml")).unwrap();
    config.sanitize();
    DeviceSession::new(&Context::from_config(&config), kind, &BuiltinLayout)
}

fn drain(session: &mut DeviceSession) -> String {
    let mut typed = String::new();
    loop {
        match session.read_keystroke() {
            Ok(data) => typed.extend(data.character()),
            Err(TranslateError::NotReady) => return typed,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[test]
fn buttons_type_text_with_shift_held_on_guide() {
    let mut session = session_from_toml(
        r#"
        [mapping.buttons]
        x = "KeyH"
        y = "KeyI"
        b = "0x1E"
        "#,
        DeviceKind::Xbox360,
    );
    let centered = ((0, 0), (0, 0));
    let mut send = |pressed: &[Button]| {
        session
            .handle_report(&xbox_report(buttons(pressed), (0, 0), centered.0, centered.1))
            .unwrap();
    };

    send(&[Button::Guide]);
    send(&[Button::Guide, Button::X]);
    send(&[]);
    send(&[Button::Y]);
    send(&[]);
    send(&[Button::Guide]);
    send(&[Button::Guide, Button::B]);
    send(&[]);

    assert_eq!(drain(&mut session), "Hi!");
}

#[test]
fn guide_held_across_letters_keeps_them_uppercase() {
    let mut session = session_from_toml(
        r#"
        [mapping.buttons]
        x = "KeyO"
        y = "KeyK"
        "#,
        DeviceKind::Xbox360,
    );
    for pressed in [
        &[Button::Guide][..],
        &[Button::Guide, Button::X],
        &[Button::Guide],
        &[Button::Guide, Button::Y],
        &[Button::Guide],
        &[Button::Guide, Button::X],
        &[],
        &[Button::Y],
        &[],
    ] {
        session
            .handle_report(&xbox_report(buttons(pressed), (0, 0), (0, 0), (0, 0)))
            .unwrap();
    }

    assert_eq!(drain(&mut session), "OKOk");
}

#[test]
fn escape_keeps_shift_state_visible() {
    let mut session = session_from_toml("", DeviceKind::Xbox360);
    session
        .handle_report(&xbox_report(buttons(&[Button::Guide]), (0, 0), (0, 0), (0, 0)))
        .unwrap();
    session
        .handle_report(&xbox_report(
            buttons(&[Button::Guide, Button::B]),
            (0, 0),
            (0, 0),
            (0, 0),
        ))
        .unwrap();

    let data = session.read_keystroke().unwrap();
    assert_eq!(data.key.scan_code, SCAN_ESC);
    assert_eq!(data.key.unicode_char, 0);
    assert!(data.state.shift.contains(ShiftState::LEFT_SHIFT));
}

#[test]
fn held_mouse_stick_moves_pointer_on_every_poll() {
    let mut session = session_from_toml("", DeviceKind::Xbox360);
    session
        .handle_report(&xbox_report(0, (0, 0), (0, 32767), (0, 0)))
        .unwrap();

    for _ in 0..3 {
        let pointer = session.read_pointer().unwrap();
        assert_eq!((pointer.relative_x, pointer.relative_y), (0, -10));
    }

    session
        .handle_report(&xbox_report(0, (0, 0), (0, 0), (0, 0)))
        .unwrap();
    assert_eq!(session.read_pointer(), None);
}

#[test]
fn scroll_stick_and_triggers_reach_the_pointer() {
    let mut session = session_from_toml("", DeviceKind::Xbox360);
    session
        .handle_report(&xbox_report(0, (200, 0), (0, 0), (0, 32767)))
        .unwrap();
    let pointer = session.read_pointer().unwrap();
    assert_eq!(pointer.relative_z, -10);
    assert!(pointer.right_button);
    assert!(!pointer.left_button);

    // Trigger at the threshold counts as released.
    session
        .handle_report(&xbox_report(0, (128, 128), (0, 0), (0, 0)))
        .unwrap();
    let pointer = session.read_pointer().unwrap();
    assert!(!pointer.right_button);
    assert_eq!(pointer.relative_z, 0);
    assert_eq!(session.read_pointer(), None);
}

#[test]
fn keys_mode_stick_types_direction_keys() {
    let mut session = session_from_toml(
        r#"
        [mapping.left_stick]
        mode = "keys"
        up = "KeyW"
        down = "KeyS"
        left = "KeyA"
        right = "KeyD"
        "#,
        DeviceKind::Xbox360,
    );
    session
        .handle_report(&xbox_report(0, (0, 0), (30000, 0), (0, 0)))
        .unwrap();
    session
        .handle_report(&xbox_report(0, (0, 0), (0, -30000), (0, 0)))
        .unwrap();
    session
        .handle_report(&xbox_report(0, (0, 0), (0, 0), (0, 0)))
        .unwrap();
    assert_eq!(drain(&mut session), "ds");
    assert_eq!(session.read_pointer().map(|p| p.relative_z), None);
}

#[test]
fn ally_reports_with_and_without_id() {
    let mut session = session_from_toml("", DeviceKind::AllyX);

    let mut body = Vec::new();
    for v in [32768u16; 4].iter().chain([0u16, 0].iter()) {
        body.extend_from_slice(&v.to_le_bytes());
    }
    body.extend_from_slice(&[0x01, 0, 0, 0]);

    let mut with_id = vec![ALLY_REPORT_ID];
    with_id.extend_from_slice(&body);
    session.handle_report(&with_id).unwrap();
    assert_eq!(session.read_keystroke().unwrap().character(), Some('\r'));
    assert!(session.baseline().is_pressed(Button::A));

    body[12] = 0;
    session.handle_report(&body).unwrap();
    assert!(!session.baseline().is_pressed(Button::A));

    assert!(session.handle_report(&body[..15]).is_err());
    assert_eq!(session.read_keystroke(), Err(TranslateError::NotReady));
}
