//! Async host for a [`TimerEngine`].
//!
//! A single tokio task owns the engine. It ticks once per second while the
//! timer is active, sleeps until a pending auto-start is due, and applies
//! host commands in arrival order. Because commands queue on a channel, a
//! toggle that arrives during a completion sequence waits until the
//! sequence has finished.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::clock::Clock;
use super::engine::TimerEngine;
use crate::error::{CoreError, EffectError, Result};
use crate::events::Event;
use crate::ports::EffectsPort;
use crate::settings::{Preset, Settings};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    ApplyPreset(Preset, oneshot::Sender<Result<Event>>),
    UpdateSettings(Settings, oneshot::Sender<Result<Option<Event>>>),
    SettingsChanged,
    Snapshot(oneshot::Sender<Event>),
    Shutdown,
}

/// Clock on tokio's time source, so paused test time and the driver's
/// sleeps agree with the engine.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Runs each effect on the blocking pool so slow sound or notification
/// backends never hold up the tick loop. Failures are logged from the task.
pub struct SpawnedEffects {
    inner: Arc<dyn EffectsPort>,
}

impl SpawnedEffects {
    pub fn new(inner: Arc<dyn EffectsPort>) -> Self {
        Self { inner }
    }

    fn dispatch<F>(&self, effect: &'static str, call: F) -> Result<(), EffectError>
    where
        F: FnOnce(&dyn EffectsPort) -> Result<(), EffectError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    if let Err(e) = call(inner.as_ref()) {
                        warn!(effect, error = %e, "completion effect failed");
                    }
                });
                Ok(())
            }
            Err(_) => call(inner.as_ref()),
        }
    }
}

impl EffectsPort for SpawnedEffects {
    fn play_completion_sound(&self) -> Result<(), EffectError> {
        self.dispatch("sound", |fx| fx.play_completion_sound())
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError> {
        let (title, body) = (title.to_string(), body.to_string());
        self.dispatch("notification", move |fx| fx.notify(&title, &body))
    }

    fn vibrate(&self, pattern: &[u64]) -> Result<(), EffectError> {
        let pattern = pattern.to_vec();
        self.dispatch("vibration", move |fx| fx.vibrate(&pattern))
    }
}

/// Cloneable handle for sending commands to a running driver.
#[derive(Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    /// Receive every event the engine produces from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(Command::Toggle).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    /// Tell the engine its settings source was edited externally.
    pub async fn settings_changed(&self) -> Result<()> {
        self.send(Command::SettingsChanged).await
    }

    pub async fn apply_preset(&self, preset: Preset) -> Result<Event> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ApplyPreset(preset, tx)).await?;
        rx.await.map_err(|_| CoreError::DriverStopped)?
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<Option<Event>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::UpdateSettings(settings, tx)).await?;
        rx.await.map_err(|_| CoreError::DriverStopped)?
    }

    pub async fn snapshot(&self) -> Result<Event> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| CoreError::DriverStopped)
    }

    /// Stop the driver. The join handle then yields the engine.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::DriverStopped)
    }
}

pub struct TimerDriver {
    engine: TimerEngine,
    commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
}

impl TimerDriver {
    /// Move `engine` onto a new task. Must be called inside a tokio runtime.
    ///
    /// The engine should run on a [`TokioClock`] so its auto-start deadline
    /// and the driver's sleeps use the same time source.
    pub fn spawn(engine: TimerEngine) -> (TimerHandle, JoinHandle<TimerEngine>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let driver = TimerDriver {
            engine,
            commands: cmd_rx,
            events: event_tx.clone(),
        };
        let join = tokio::spawn(driver.run());
        (
            TimerHandle {
                commands: cmd_tx,
                events: event_tx,
            },
            join,
        )
    }

    async fn run(mut self) -> TimerEngine {
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let auto_start_in = self.engine.pending_start_in();
            let was_active = self.engine.is_active();

            tokio::select! {
                biased;
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command) {
                        break;
                    }
                }
                _ = ticker.tick(), if was_active => {
                    if let Some(event) = self.engine.tick() {
                        self.publish(event);
                    }
                }
                _ = tokio::time::sleep(auto_start_in.unwrap_or_default()), if auto_start_in.is_some() => {
                    if let Some(event) = self.engine.run_due() {
                        self.publish(event);
                    }
                }
            }

            // Count a fresh second from the moment the timer became active.
            if !was_active && self.engine.is_active() {
                ticker.reset();
            }
        }

        debug!("timer driver stopped");
        self.engine
    }

    /// Returns false when the driver should stop.
    fn handle(&mut self, command: Command) -> bool {
        let event = match command {
            Command::Start => self.engine.start(),
            Command::Pause => self.engine.pause(),
            Command::Toggle => self.engine.toggle(),
            Command::Reset => self.engine.reset(),
            Command::SettingsChanged => self.engine.settings_changed(),
            Command::ApplyPreset(preset, reply) => {
                let result = self.engine.apply_preset(&preset);
                let event = result.as_ref().ok().cloned();
                let _ = reply.send(result);
                event
            }
            Command::UpdateSettings(settings, reply) => {
                let result = self.engine.update_settings(settings);
                let event = result.as_ref().ok().cloned().flatten();
                let _ = reply.send(result);
                event
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
                None
            }
            Command::Shutdown => return false,
        };
        if let Some(event) = event {
            self.publish(event);
        }
        true
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
