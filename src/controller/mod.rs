//! Controller subsystem: from raw report bytes to key transitions
//!
//! Implements the producer half of the input pipeline:
//!
//! 1. [`report`] - Normalizes raw device reports into [`ControllerState`]
//! 2. [`response`] - Deadzone, curve and speed transforms for the sticks
//! 3. [`diff`] - Edge detection between consecutive states
//! 4. [`queue`] - Bounded drop-oldest queue towards the translator
//! 5. [`device`] - VID/PID classification of supported devices
//!
//! # Architecture
//!
//! ```text
//! Bytes ──► Normalizer ──► Diff Engine ──► EventQueue ──► (keyboard translator)
//!                              │
//!                              └──────────► PointerTracker
//! ```

pub mod device;
pub mod diff;
pub mod queue;
pub mod report;
pub mod response;

pub use device::{DeviceClassifier, DeviceInfo};
pub use diff::{diff_states, KeyTransition, PointerState, PointerTracker, TransitionSink};
pub use queue::{EventQueue, QUEUE_SLOTS};
pub use report::{normalize, Button, ControllerState, DeviceKind, ReportError};
