//! padbridge: gamepad reports in, keystrokes and pointer events out.
//!
//! ```text
//! transport ─► SessionActor ─► DeviceSession ─┬─► keystroke sink
//!                  ▲                          └─► pointer sink
//!                  └── SessionHandle (consumers)
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod keyboard;
pub mod mapping;
pub mod session;
