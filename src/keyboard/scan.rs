//! Scan codes and control characters of the keystroke sink.

pub const SCAN_NULL: u16 = 0x00;
pub const SCAN_UP: u16 = 0x01;
pub const SCAN_DOWN: u16 = 0x02;
pub const SCAN_RIGHT: u16 = 0x03;
pub const SCAN_LEFT: u16 = 0x04;
pub const SCAN_HOME: u16 = 0x05;
pub const SCAN_END: u16 = 0x06;
pub const SCAN_INSERT: u16 = 0x07;
pub const SCAN_DELETE: u16 = 0x08;
pub const SCAN_PAGE_UP: u16 = 0x09;
pub const SCAN_PAGE_DOWN: u16 = 0x0A;
pub const SCAN_F1: u16 = 0x0B;
pub const SCAN_F10: u16 = 0x14;
pub const SCAN_F11: u16 = 0x15;
pub const SCAN_F12: u16 = 0x16;
pub const SCAN_ESC: u16 = 0x17;
pub const SCAN_PAUSE: u16 = 0x48;

pub const CHAR_NULL: u16 = 0x0000;
pub const CHAR_BACKSPACE: u16 = 0x0008;
pub const CHAR_TAB: u16 = 0x0009;
pub const CHAR_CARRIAGE_RETURN: u16 = 0x000D;
pub const CHAR_ESC: u16 = 0x001B;

/// Scan code for function key `n` (1..=12), `SCAN_NULL` otherwise.
pub const fn function_key(n: u8) -> u16 {
    match n {
        1..=12 => SCAN_F1 + (n as u16 - 1),
        _ => SCAN_NULL,
    }
}
