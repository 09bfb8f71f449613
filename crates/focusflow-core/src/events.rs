use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Mode, ProgressAnchor};

/// Every state change of the timer produces an Event.
/// Hosts render from them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        remaining_secs: u64,
        total_secs: u64,
        /// Started by the deferred auto-start rather than by the user.
        auto: bool,
        anchor: ProgressAnchor,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        remaining_secs: u64,
        progress: f64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        mode: Mode,
        duration_secs: u64,
        cycles_completed: u64,
        next_mode: Mode,
        next_total_secs: u64,
        /// Delay before the next interval starts on its own, if it will.
        auto_start_in_ms: Option<u64>,
        /// Whether the session sink accepted the entry.
        recorded: bool,
        /// Number of effect calls that failed.
        effect_failures: u8,
        at: DateTime<Utc>,
    },
    /// A pending auto-start was dropped by a user action.
    AutoStartCancelled {
        mode: Mode,
        at: DateTime<Utc>,
    },
    TimerReset {
        total_secs: u64,
        at: DateTime<Utc>,
    },
    PresetApplied {
        preset: String,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// Durations were recomputed after a settings change while paused.
    SettingsApplied {
        mode: Mode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: Mode,
        remaining_secs: u64,
        total_secs: u64,
        is_active: bool,
        cycles_completed: u64,
        progress: f64,
        /// Progress interpolated between ticks, for smooth rendering.
        progress_smooth: f64,
        /// `MM:SS` countdown label.
        display: String,
        auto_start_pending: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short snake_case name, matches the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerCompleted { .. } => "timer_completed",
            Event::AutoStartCancelled { .. } => "auto_start_cancelled",
            Event::TimerReset { .. } => "timer_reset",
            Event::PresetApplied { .. } => "preset_applied",
            Event::SettingsApplied { .. } => "settings_applied",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_serialized_tag() {
        let event = Event::TimerReset {
            total_secs: 1500,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }
}
