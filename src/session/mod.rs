//! Device Session
//!
//! Owns everything one attached controller needs between reports: the
//! baseline state, the key transition queue, the translator and the pointer
//! state. All configuration comes in through an explicit [`Context`].
//!
//! ```text
//! report ─► normalize ─► diff_states ─┬─► key queue ─► read_keystroke ─► KeyData
//!              │                      └─► pointer ───► read_pointer ───► PointerState
//!              └─► baseline
//! ```

pub mod actor;

use crate::config::{AppConfig, KeyboardConfig};
use crate::controller::device::DeviceClassifier;
use crate::controller::diff::{diff_states, DiffSummary, KeyTransition, PointerState, PointerTracker, TransitionSink};
use crate::controller::queue::{EventQueue, QUEUE_SLOTS};
use crate::controller::report::{normalize, ControllerState, DeviceKind, ReportError};
use crate::keyboard::layout::{Layout, LayoutProvider};
use crate::keyboard::translator::{
    KeyData, Notification, NotifyId, ToggleState, TranslateError, Translator, TranslatorEffects,
};
use crate::mapping::config::MappingConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub use actor::{HostHooks, LoggingHooks, NullTransport, SessionActor, SessionHandle, Transport};

const CAPS_LOCK_USAGE: u8 = 0x39;
const SCROLL_LOCK_USAGE: u8 = 0x47;
const NUM_LOCK_USAGE: u8 = 0x53;

/// Usages the repeat timer may replay. Lock keys would toggle back and forth.
pub fn is_repeatable(usage: u8) -> bool {
    matches!(usage, 0x04..=0x65)
        && !matches!(usage, CAPS_LOCK_USAGE | SCROLL_LOCK_USAGE | NUM_LOCK_USAGE)
}

/// Shared, read-only settings for every session.
#[derive(Debug, Clone)]
pub struct Context {
    pub mapping: Arc<MappingConfig>,
    pub keyboard: KeyboardConfig,
    pub classifier: Arc<DeviceClassifier>,
}

impl Context {
    pub fn new(mapping: MappingConfig, keyboard: KeyboardConfig) -> Self {
        Self {
            mapping: Arc::new(mapping),
            keyboard,
            classifier: Arc::new(DeviceClassifier::default()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mapping: Arc::new(config.mapping.clone()),
            keyboard: config.keyboard.clone(),
            classifier: Arc::new(DeviceClassifier::new(&config.devices.custom)),
        }
    }

    /// Layout from the provider, the built-in one if that is allowed.
    pub fn resolve_layout(&self, provider: &dyn LayoutProvider) -> Option<Layout> {
        if let Some(layout) = provider.layout() {
            return Some(layout);
        }
        if self.keyboard.fallback_layout {
            warn!("No keyboard layout available, falling back to US English");
            Some(Layout::us_english())
        } else {
            error!("No keyboard layout available, keystrokes disabled");
            None
        }
    }
}

/// What the repeat timer should do after a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatAction {
    #[default]
    Keep,
    Arm(u8),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOutcome {
    pub summary: DiffSummary,
    pub repeat: RepeatAction,
}

type KeyQueue = EventQueue<KeyTransition, QUEUE_SLOTS>;

/// Queue sink that also tracks the repeat key.
struct SessionSink<'a> {
    queue: &'a mut KeyQueue,
    repeat_key: &'a mut Option<u8>,
    repeat: RepeatAction,
}

impl TransitionSink for SessionSink<'_> {
    fn key_transition(&mut self, transition: KeyTransition) {
        self.queue.push(transition);
        if transition.pressed {
            if is_repeatable(transition.code) {
                *self.repeat_key = Some(transition.code);
                self.repeat = RepeatAction::Arm(transition.code);
            }
        } else if *self.repeat_key == Some(transition.code) {
            *self.repeat_key = None;
            self.repeat = RepeatAction::Cancel;
        }
    }
}

pub struct DeviceSession {
    kind: DeviceKind,
    mapping: Arc<MappingConfig>,
    baseline: ControllerState,
    queue: KeyQueue,
    translator: Translator,
    pointer: PointerTracker,
    repeat_key: Option<u8>,
}

impl DeviceSession {
    pub fn new(context: &Context, kind: DeviceKind, provider: &dyn LayoutProvider) -> Self {
        let layout = context.resolve_layout(provider);
        info!(
            "Session for {} ready (layout: {})",
            kind,
            if layout.is_some() { "loaded" } else { "none" }
        );
        Self {
            kind,
            mapping: context.mapping.clone(),
            baseline: ControllerState::default(),
            queue: KeyQueue::new(),
            translator: Translator::new(layout, context.keyboard.partial_keys),
            pointer: PointerTracker::default(),
            repeat_key: None,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn baseline(&self) -> &ControllerState {
        &self.baseline
    }

    pub fn repeat_key(&self) -> Option<u8> {
        self.repeat_key
    }

    pub fn pending_transitions(&self) -> usize {
        self.queue.len()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Normalizes and diffs one report against the baseline. A malformed
    /// report changes nothing.
    pub fn handle_report(&mut self, data: &[u8]) -> Result<ReportOutcome, ReportError> {
        let state = normalize(self.kind, data).inspect_err(|e| warn!("Dropping report: {}", e))?;

        let mut sink = SessionSink {
            queue: &mut self.queue,
            repeat_key: &mut self.repeat_key,
            repeat: RepeatAction::Keep,
        };
        let summary = diff_states(&self.baseline, &state, &self.mapping, &mut sink, &mut self.pointer);
        let repeat = sink.repeat;
        self.baseline = state;

        Ok(ReportOutcome { summary, repeat })
    }

    /// Next keystroke. Releases, bare modifiers and invalid codes are consumed
    /// silently; an empty queue gives [`TranslateError::NotReady`].
    pub fn read_keystroke(&mut self) -> Result<KeyData, TranslateError> {
        if !self.translator.has_layout() {
            return Err(TranslateError::LayoutUnavailable);
        }
        while let Some(transition) = self.queue.pop() {
            match self.translator.translate(transition) {
                Ok(data) => return Ok(data),
                Err(TranslateError::NotReady) => {}
                Err(TranslateError::InvalidScancode(code)) => {
                    debug!("Skipping invalid usage {:#04x}", code);
                }
                Err(e) => return Err(e),
            }
        }
        Err(TranslateError::NotReady)
    }

    pub fn read_pointer(&mut self) -> Option<PointerState> {
        self.pointer.read()
    }

    /// Replays a press of the armed repeat key. Returns false if none is armed.
    pub fn inject_repeat(&mut self) -> bool {
        match self.repeat_key {
            Some(code) => {
                self.queue.push(KeyTransition::press(code));
                true
            }
            None => false,
        }
    }

    pub fn cancel_repeat(&mut self) {
        self.repeat_key = None;
    }

    pub fn set_layout(&mut self, layout: Option<Layout>) {
        self.translator.set_layout(layout);
    }

    pub fn set_toggle_state(&mut self, toggle: ToggleState) -> Result<(), TranslateError> {
        self.translator.set_toggle_state(toggle)
    }

    pub fn register_notify(&mut self, pattern: KeyData) -> NotifyId {
        self.translator.register_notify(pattern)
    }

    pub fn unregister_notify(&mut self, id: NotifyId) -> bool {
        self.translator.unregister_notify(id)
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.translator.pop_notification()
    }

    pub fn take_effects(&mut self) -> TranslatorEffects {
        self.translator.take_effects()
    }

    /// Forgets held keys, queued transitions, pointer state and the repeat key.
    pub fn reset(&mut self) {
        self.baseline = ControllerState::default();
        self.queue.clear();
        self.pointer.reset();
        self.repeat_key = None;
        self.translator.reset();
    }
}
