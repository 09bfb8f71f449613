//! Timer engine implementation.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads: the host calls `tick()` once per second while the timer is
//! active, and `run_due()` to let a pending auto-start fire.
//!
//! ## State Transitions
//!
//! ```text
//! Focus ──complete──> ShortBreak | LongBreak ──complete──> Focus
//!   (each mode is either active or paused)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(settings, effects, sink);
//! engine.start();
//! // Once per second:
//! engine.tick(); // Returns Some(Event::TimerCompleted) when the interval ends
//! engine.run_due(); // Starts the next interval once the auto-start delay passed
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::completion::{self, DeferredStart, AUTO_START_DELAY_MS};
use super::mode::Mode;
use super::progress::{progress_fraction, ProgressAnchor, ProgressClock};
use crate::error::Result;
use crate::events::Event;
use crate::ports::{EffectsPort, SessionEntry, SessionSink};
use crate::settings::{Preset, Settings, SettingsSource};

/// Observable timer state. Only the engine mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: Mode,
    pub remaining_secs: u64,
    /// Duration of the current interval, fixed when the mode was entered.
    pub total_secs: u64,
    pub is_active: bool,
    pub cycles_completed: u64,
}

impl TimerState {
    /// Fresh Focus interval, paused, no cycles.
    pub fn initial(settings: &Settings) -> Self {
        let total_secs = Mode::Focus.duration_secs(settings);
        Self {
            mode: Mode::Focus,
            remaining_secs: total_secs,
            total_secs,
            is_active: false,
            cycles_completed: 0,
        }
    }

    pub fn progress(&self) -> f64 {
        progress_fraction(self.remaining_secs, self.total_secs)
    }
}

/// Core timer engine.
///
/// Owns the only [`TimerState`]. Every mutating operation takes `&mut self`,
/// so operations cannot interleave and the completion sequence cannot be
/// re-entered while it runs.
pub struct TimerEngine {
    state: TimerState,
    progress: ProgressClock,
    pending_start: Option<DeferredStart>,
    settings: Box<dyn SettingsSource>,
    effects: Arc<dyn EffectsPort>,
    sink: Box<dyn SessionSink>,
    clock: Arc<dyn Clock>,
}

impl TimerEngine {
    /// Create an engine on the system clock.
    ///
    /// Starts paused at the beginning of a Focus interval.
    pub fn new(
        settings: impl SettingsSource + 'static,
        effects: impl EffectsPort + 'static,
        sink: impl SessionSink + 'static,
    ) -> Self {
        Self::from_parts(
            Box::new(settings),
            Arc::new(effects),
            Box::new(sink),
            Arc::new(SystemClock::new()),
        )
    }

    pub fn from_parts(
        settings: Box<dyn SettingsSource>,
        effects: Arc<dyn EffectsPort>,
        sink: Box<dyn SessionSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = TimerState::initial(&settings.get());
        let mut progress = ProgressClock::new();
        progress.on_interval(state.remaining_secs, state.total_secs);
        Self {
            state,
            progress,
            pending_start: None,
            settings,
            effects,
            sink,
            clock,
        }
    }

    /// Replace the time source. Intended right after construction.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.state.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.state.total_secs
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn cycles_completed(&self) -> u64 {
        self.state.cycles_completed
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    /// 0.0 .. 1.0 progress within the current interval, per tick.
    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    /// Anchor captured when the timer last became active; `None` while paused.
    pub fn progress_anchor(&self) -> Option<ProgressAnchor> {
        self.progress.anchor()
    }

    /// Interpolated progress for rendering between ticks.
    pub fn sample_progress(&self) -> f64 {
        self.progress.sample(self.clock.now_ms())
    }

    pub fn auto_start_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Time until the pending auto-start is due.
    pub fn pending_start_in(&self) -> Option<Duration> {
        self.pending_start
            .map(|p| Duration::from_millis(p.remaining_ms(self.clock.now_ms())))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            total_secs: self.state.total_secs,
            is_active: self.state.is_active,
            cycles_completed: self.state.cycles_completed,
            progress: self.progress(),
            progress_smooth: self.sample_progress(),
            display: format_clock(self.state.remaining_secs),
            auto_start_pending: self.auto_start_pending(),
            at: self.clock.now_utc(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown. Supersedes a pending auto-start.
    pub fn start(&mut self) -> Option<Event> {
        self.cancel_pending();
        self.activate(false)
    }

    /// Freeze the countdown. Also drops a pending auto-start.
    pub fn pause(&mut self) -> Option<Event> {
        let cancelled = self.cancel_pending();
        if !self.state.is_active {
            return cancelled.then(|| Event::AutoStartCancelled {
                mode: self.state.mode,
                at: self.clock.now_utc(),
            });
        }
        self.state.is_active = false;
        self.progress
            .on_pause(self.state.remaining_secs, self.state.total_secs);
        Some(Event::TimerPaused {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            progress: self.progress(),
            at: self.clock.now_utc(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.state.is_active {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `Some(Event::TimerCompleted)` on the tick that reaches zero.
    /// A no-op while paused.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        if self.state.remaining_secs > 0 {
            self.state.remaining_secs -= 1;
            self.progress
                .on_tick(self.state.remaining_secs, self.state.total_secs);
        }
        if self.state.remaining_secs == 0 {
            return Some(self.complete());
        }
        None
    }

    /// Back to a paused Focus interval with no completed cycles.
    pub fn reset(&mut self) -> Option<Event> {
        self.cancel_pending();
        self.state = TimerState::initial(&self.settings.get());
        self.progress
            .on_interval(self.state.remaining_secs, self.state.total_secs);
        Some(Event::TimerReset {
            total_secs: self.state.total_secs,
            at: self.clock.now_utc(),
        })
    }

    /// Overwrite durations from `preset` and restart at a paused Focus
    /// interval with no cycles. The in-progress interval is discarded.
    ///
    /// # Errors
    /// Returns `InvalidPreset` for a zero duration, leaving state unchanged,
    /// or the settings source's error if the settings could not be stored.
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<Event> {
        preset.validate()?;
        let settings = self.settings.get().with_preset(preset);
        self.settings.replace(settings)?;

        self.cancel_pending();
        self.state = TimerState::initial(&self.settings.get());
        self.progress
            .on_interval(self.state.remaining_secs, self.state.total_secs);
        info!(preset = %preset.name, work = preset.work, "preset applied");
        Ok(Event::PresetApplied {
            preset: preset.name.clone(),
            total_secs: self.state.total_secs,
            at: self.clock.now_utc(),
        })
    }

    /// Validate and store new settings, then recompute the current interval
    /// if the timer is paused.
    ///
    /// # Errors
    /// Returns `InvalidSettings` without storing anything if validation fails.
    pub fn update_settings(&mut self, settings: Settings) -> Result<Option<Event>> {
        settings.validate()?;
        self.settings.replace(settings)?;
        Ok(self.settings_changed())
    }

    /// Settings were edited behind the engine's back.
    ///
    /// While paused the current interval restarts at the new duration. While
    /// active nothing changes: the new durations apply from the next interval.
    pub fn settings_changed(&mut self) -> Option<Event> {
        if self.state.is_active {
            debug!(mode = %self.state.mode, "settings change deferred to next interval");
            return None;
        }
        let total_secs = self.state.mode.duration_secs(&self.settings.get());
        self.state.total_secs = total_secs;
        self.state.remaining_secs = total_secs;
        self.progress.on_interval(total_secs, total_secs);
        Some(Event::SettingsApplied {
            mode: self.state.mode,
            total_secs,
            at: self.clock.now_utc(),
        })
    }

    /// Fire the pending auto-start once its delay has elapsed.
    pub fn run_due(&mut self) -> Option<Event> {
        let pending = self.pending_start?;
        if !pending.is_due(self.clock.now_ms()) {
            return None;
        }
        self.pending_start = None;
        debug!(mode = %self.state.mode, "auto-starting next interval");
        self.activate(true)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn activate(&mut self, auto: bool) -> Option<Event> {
        if self.state.is_active {
            return None;
        }
        self.state.is_active = true;
        let anchor = self.progress.on_start(
            self.state.remaining_secs,
            self.state.total_secs,
            self.clock.now_ms(),
        );
        Some(Event::TimerStarted {
            mode: self.state.mode,
            remaining_secs: self.state.remaining_secs,
            total_secs: self.state.total_secs,
            auto,
            anchor,
            at: self.clock.now_utc(),
        })
    }

    /// Returns whether an auto-start was pending.
    fn cancel_pending(&mut self) -> bool {
        let cancelled = self.pending_start.take().is_some();
        if cancelled {
            debug!(mode = %self.state.mode, "pending auto-start cancelled");
        }
        cancelled
    }

    /// The completion sequence: announce, record, transition, schedule.
    fn complete(&mut self) -> Event {
        let finished = self.state.mode;
        let duration_secs = self.state.total_secs;
        let completed_at = self.clock.now_utc();
        let settings = self.settings.get();

        let cycles_completed = match finished {
            Mode::Focus => self.state.cycles_completed + 1,
            Mode::ShortBreak | Mode::LongBreak => self.state.cycles_completed,
        };
        let transition = finished.transition(cycles_completed, &settings);

        let effect_failures = completion::announce(self.effects.as_ref(), finished, transition.next);
        let entry = SessionEntry {
            mode: finished,
            duration_secs,
            completed_at,
        };
        let recorded = completion::record(self.sink.as_mut(), &entry);

        let next_total_secs = transition.next.duration_secs(&settings);
        self.state = TimerState {
            mode: transition.next,
            remaining_secs: next_total_secs,
            total_secs: next_total_secs,
            is_active: false,
            cycles_completed,
        };
        self.progress.on_interval(next_total_secs, next_total_secs);

        let auto_start_in_ms = if transition.auto_start {
            self.pending_start = Some(DeferredStart::after(
                self.clock.now_ms(),
                AUTO_START_DELAY_MS,
            ));
            Some(AUTO_START_DELAY_MS)
        } else {
            None
        };

        info!(
            mode = %finished,
            duration_secs,
            cycles_completed,
            next = %transition.next,
            recorded,
            "interval completed"
        );

        Event::TimerCompleted {
            mode: finished,
            duration_secs,
            cycles_completed,
            next_mode: transition.next,
            next_total_secs,
            auto_start_in_ms,
            recorded,
            effect_failures,
            at: completed_at,
        }
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("pending_start", &self.pending_start)
            .finish_non_exhaustive()
    }
}

/// `MM:SS` countdown label. Minutes are not wrapped into hours.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
