//! Session actor with statum state machine
//!
//! Runs one [`DeviceSession`] inside its own tokio task. Producers (the
//! transport) and consumers (keystroke and pointer readers) talk to it only
//! through [`SessionCommand`]s, so the session state never needs a lock.
//!
//! # State Machine
//!
//! ```text
//! Configured ──► Running ──► Stopped
//!                  │  ▲
//!                  └──┘ commands, repeat timer, recovery timer
//! ```

use super::{DeviceSession, RepeatAction};
use crate::config::AppConfig;
use crate::controller::diff::PointerState;
use crate::error::SessionError;
use crate::keyboard::translator::{KeyData, NotifyId, ToggleState, TranslateError};
use statum::{machine, state};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMMAND_CHANNEL_SIZE: usize = 64;

/// Control surface of the device transport.
pub trait Transport: Send {
    /// Clears a halted endpoint.
    fn clear_halt(&mut self) -> Result<(), SessionError>;
    /// Cancels the outstanding transfer.
    fn cancel(&mut self);
    /// Submits the transfer again.
    fn resubmit(&mut self) -> Result<(), SessionError>;
}

/// Host side reactions to keyboard state.
pub trait HostHooks: Send {
    fn set_indicators(&mut self, toggle: ToggleState);
    fn warm_reset(&mut self);
}

/// Transport without a device behind it.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn clear_halt(&mut self) -> Result<(), SessionError> {
        debug!("clear_halt");
        Ok(())
    }

    fn cancel(&mut self) {
        debug!("cancel");
    }

    fn resubmit(&mut self) -> Result<(), SessionError> {
        debug!("resubmit");
        Ok(())
    }
}

/// Hooks that only log.
#[derive(Debug, Default)]
pub struct LoggingHooks;

impl HostHooks for LoggingHooks {
    fn set_indicators(&mut self, toggle: ToggleState) {
        info!(
            "Indicators: caps={} num={} scroll={}",
            toggle.contains(ToggleState::CAPS_LOCK),
            toggle.contains(ToggleState::NUM_LOCK),
            toggle.contains(ToggleState::SCROLL_LOCK)
        );
    }

    fn warm_reset(&mut self) {
        warn!("Warm reset requested");
    }
}

/// Timer settings of the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorTiming {
    pub repeat_delay: Duration,
    pub repeat_rate: Duration,
    pub recovery_delay: Duration,
}

impl Default for ActorTiming {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ActorTiming {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            repeat_delay: config.keyboard.repeat_delay(),
            repeat_rate: config.keyboard.repeat_rate(),
            recovery_delay: config.transport.recovery_delay(),
        }
    }
}

// Befehle an den Session-Actor
#[derive(Debug)]
pub enum SessionCommand {
    Report(Vec<u8>),
    TransportError {
        stalled: bool,
    },
    ReadKey {
        response_tx: oneshot::Sender<Result<KeyData, TranslateError>>,
    },
    ReadPointer {
        response_tx: oneshot::Sender<Option<PointerState>>,
    },
    SetToggleState {
        toggle: ToggleState,
        response_tx: oneshot::Sender<Result<(), TranslateError>>,
    },
    RegisterNotify {
        key: KeyData,
        notify_tx: mpsc::Sender<KeyData>,
        response_tx: oneshot::Sender<NotifyId>,
    },
    UnregisterNotify {
        id: NotifyId,
        response_tx: oneshot::Sender<bool>,
    },
    Reset {
        response_tx: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Zustände des Session-Actors
#[state]
#[derive(Debug, Clone)]
pub enum ActorState {
    Configured,
    Running,
    Stopped,
}

#[machine]
pub struct SessionActor<S: ActorState> {
    session: DeviceSession,
    commands: mpsc::Receiver<SessionCommand>,
    transport: Box<dyn Transport>,
    hooks: Box<dyn HostHooks>,
    timing: ActorTiming,
    subscribers: HashMap<NotifyId, mpsc::Sender<KeyData>>,
    shutdown: CancellationToken,
    repeat_at: Option<Instant>,
    recover_at: Option<Instant>,
}

impl SessionActor<Configured> {
    pub fn create(
        session: DeviceSession,
        commands: mpsc::Receiver<SessionCommand>,
        transport: Box<dyn Transport>,
        hooks: Box<dyn HostHooks>,
        timing: ActorTiming,
        shutdown: CancellationToken,
    ) -> Self {
        Self::new(
            session,
            commands,
            transport,
            hooks,
            timing,
            HashMap::new(),
            shutdown,
            None, // repeat_at
            None, // recover_at
        )
    }

    pub fn start(self) -> SessionActor<Running> {
        info!("Session actor for {} running", self.session.kind());
        self.transition()
    }

    /// Creates the actor, starts it in a tokio task and returns its handle.
    /// The task yields the session back once the actor stops.
    pub fn spawn(
        session: DeviceSession,
        transport: Box<dyn Transport>,
        hooks: Box<dyn HostHooks>,
        timing: ActorTiming,
        shutdown: CancellationToken,
    ) -> (SessionHandle, JoinHandle<DeviceSession>) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let actor = Self::create(session, rx, transport, hooks, timing, shutdown).start();
        let task = tokio::spawn(async move { actor.run().await.into_session() });
        (SessionHandle { tx }, task)
    }
}

/// Waits for the deadline, forever if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl SessionActor<Running> {
    pub async fn run(mut self) -> SessionActor<Stopped> {
        loop {
            let repeat_at = self.repeat_at;
            let recover_at = self.recover_at;

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = wait_until(repeat_at) => self.fire_repeat(),

                _ = wait_until(recover_at) => self.fire_recovery(),

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("All session handles dropped");
                        break;
                    }
                },
            }

            self.dispatch();
        }

        self.stop()
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Report(data) => {
                if let Ok(outcome) = self.session.handle_report(&data) {
                    match outcome.repeat {
                        RepeatAction::Arm(code) => {
                            debug!("Repeat armed for {:#04x}", code);
                            self.repeat_at = Some(Instant::now() + self.timing.repeat_delay);
                        }
                        RepeatAction::Cancel => self.repeat_at = None,
                        RepeatAction::Keep => {}
                    }
                }
            }
            SessionCommand::TransportError { stalled } => self.on_transport_error(stalled),
            SessionCommand::ReadKey { response_tx } => {
                respond(response_tx, self.session.read_keystroke());
            }
            SessionCommand::ReadPointer { response_tx } => {
                respond(response_tx, self.session.read_pointer());
            }
            SessionCommand::SetToggleState {
                toggle,
                response_tx,
            } => {
                respond(response_tx, self.session.set_toggle_state(toggle));
            }
            SessionCommand::RegisterNotify {
                key,
                notify_tx,
                response_tx,
            } => {
                let id = self.session.register_notify(key);
                self.subscribers.insert(id, notify_tx);
                debug!("Notify {:?} registered", id);
                respond(response_tx, id);
            }
            SessionCommand::UnregisterNotify { id, response_tx } => {
                self.subscribers.remove(&id);
                respond(response_tx, self.session.unregister_notify(id));
            }
            SessionCommand::Reset { response_tx } => {
                self.repeat_at = None;
                self.session.reset();
                respond(response_tx, ());
            }
            // Handled by the run loop.
            SessionCommand::Shutdown => {}
        }
    }

    fn on_transport_error(&mut self, stalled: bool) {
        warn!("Transport error (stalled: {}), scheduling recovery", stalled);
        self.session.cancel_repeat();
        self.repeat_at = None;
        if stalled {
            if let Err(e) = self.transport.clear_halt() {
                error!("Failed to clear halt: {}", e);
            }
        }
        self.transport.cancel();
        self.recover_at = Some(Instant::now() + self.timing.recovery_delay);
    }

    fn fire_recovery(&mut self) {
        self.recover_at = None;
        match self.transport.resubmit() {
            Ok(()) => info!("Transport resubmitted"),
            Err(e) => error!("Resubmit failed: {}", e),
        }
    }

    fn fire_repeat(&mut self) {
        self.repeat_at = if self.session.inject_repeat() {
            Some(Instant::now() + self.timing.repeat_rate)
        } else {
            None
        };
    }

    /// Forwards host effects and pending notifications.
    fn dispatch(&mut self) {
        let effects = self.session.take_effects();
        if let Some(toggle) = effects.indicators {
            self.hooks.set_indicators(toggle);
        }
        if effects.warm_reset {
            self.hooks.warm_reset();
        }

        while let Some(notification) = self.session.pop_notification() {
            if let Some(tx) = self.subscribers.get(&notification.id) {
                if let Err(e) = tx.try_send(notification.key) {
                    debug!("Notification {:?} dropped: {}", notification.id, e);
                }
            }
        }
    }

    fn stop(mut self) -> SessionActor<Stopped> {
        self.repeat_at = None;
        self.recover_at = None;
        self.session.cancel_repeat();
        info!("Session actor stopped");
        self.transition()
    }
}

impl SessionActor<Stopped> {
    pub fn into_session(self) -> DeviceSession {
        self.session
    }
}

fn respond<T>(response_tx: oneshot::Sender<T>, value: T) {
    if response_tx.send(value).is_err() {
        error!("Failed to send response");
    }
}

/// Cloneable front end of a running actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| SessionError::Stopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(build(response_tx)).await?;
        response_rx.await.map_err(|_| SessionError::Stopped)
    }

    pub async fn submit_report(&self, data: Vec<u8>) -> Result<(), SessionError> {
        self.send(SessionCommand::Report(data)).await
    }

    pub async fn transport_error(&self, stalled: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::TransportError { stalled }).await
    }

    /// Next keystroke, `None` if nothing is pending.
    pub async fn read_key(&self) -> Result<Option<KeyData>, SessionError> {
        match self
            .request(|response_tx| SessionCommand::ReadKey { response_tx })
            .await?
        {
            Ok(data) => Ok(Some(data)),
            Err(TranslateError::NotReady) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read_pointer(&self) -> Result<Option<PointerState>, SessionError> {
        self.request(|response_tx| SessionCommand::ReadPointer { response_tx })
            .await
    }

    pub async fn set_toggle_state(&self, toggle: ToggleState) -> Result<(), SessionError> {
        self.request(|response_tx| SessionCommand::SetToggleState {
            toggle,
            response_tx,
        })
        .await?
        .map_err(SessionError::from)
    }

    /// Registers a pattern; matching keystrokes are sent to `notify_tx`.
    pub async fn register_notify(
        &self,
        key: KeyData,
        notify_tx: mpsc::Sender<KeyData>,
    ) -> Result<NotifyId, SessionError> {
        self.request(|response_tx| SessionCommand::RegisterNotify {
            key,
            notify_tx,
            response_tx,
        })
        .await
    }

    pub async fn unregister_notify(&self, id: NotifyId) -> Result<bool, SessionError> {
        self.request(|response_tx| SessionCommand::UnregisterNotify { id, response_tx })
            .await
    }

    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(|response_tx| SessionCommand::Reset { response_tx })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }
}
