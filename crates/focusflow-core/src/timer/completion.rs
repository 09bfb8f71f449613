//! Side effects of a finished interval.
//!
//! The engine runs these in a fixed order: announce (sound, notification,
//! vibration), then record, then transition. Each step is isolated so a
//! failure in one never keeps the others from running.

use tracing::warn;

use super::mode::Mode;
use crate::ports::{EffectsPort, SessionEntry, SessionSink};

/// Delay between a completion and the auto-started next interval.
pub const AUTO_START_DELAY_MS: u64 = 500;

/// Wait/vibrate pairs in milliseconds.
pub const VIBRATION_PATTERN: [u64; 4] = [0, 250, 250, 250];

/// Notification title and body for the end of `finished`.
pub fn completion_message(finished: Mode, next: Mode) -> (&'static str, &'static str) {
    match (finished, next) {
        (Mode::Focus, Mode::LongBreak) => ("Focus complete", "Time for a long break."),
        (Mode::Focus, _) => ("Focus complete", "Time for a short break."),
        (Mode::ShortBreak | Mode::LongBreak, _) => ("Break over", "Ready to focus again?"),
    }
}

/// Fire every completion effect. Returns how many failed.
pub fn announce(effects: &dyn EffectsPort, finished: Mode, next: Mode) -> u8 {
    let (title, body) = completion_message(finished, next);
    let results = [
        ("sound", effects.play_completion_sound()),
        ("notification", effects.notify(title, body)),
        ("vibration", effects.vibrate(&VIBRATION_PATTERN)),
    ];

    let mut failures = 0;
    for (effect, result) in results {
        if let Err(e) = result {
            warn!(effect, error = %e, mode = %finished, "completion effect failed");
            failures += 1;
        }
    }
    failures
}

/// Append the finished session. Returns whether the sink accepted it.
pub fn record(sink: &mut dyn SessionSink, entry: &SessionEntry) -> bool {
    match sink.record(entry) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                error = %e,
                mode = %entry.mode,
                duration_secs = entry.duration_secs,
                "failed to record completed session"
            );
            false
        }
    }
}

/// A `start()` scheduled for later. Owned by the engine and dropped by any
/// user action that changes the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredStart {
    pub due_at_ms: u64,
}

impl DeferredStart {
    pub fn after(now_ms: u64, delay_ms: u64) -> Self {
        Self {
            due_at_ms: now_ms.saturating_add(delay_ms),
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.due_at_ms
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.due_at_ms.saturating_sub(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EffectError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingEffects {
        calls: AtomicUsize,
    }

    impl EffectsPort for FailingEffects {
        fn play_completion_sound(&self) -> Result<(), EffectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EffectError::Unsupported("sound"))
        }

        fn notify(&self, _title: &str, _body: &str) -> Result<(), EffectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn vibrate(&self, _pattern: &[u64]) -> Result<(), EffectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EffectError::Failed {
                effect: "vibration",
                message: "no motor".into(),
            })
        }
    }

    #[test]
    fn failed_effect_does_not_skip_the_rest() {
        let effects = FailingEffects {
            calls: AtomicUsize::new(0),
        };
        let failures = announce(&effects, Mode::Focus, Mode::ShortBreak);
        assert_eq!(failures, 2);
        assert_eq!(effects.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn message_mentions_long_break() {
        let (title, body) = completion_message(Mode::Focus, Mode::LongBreak);
        assert_eq!(title, "Focus complete");
        assert!(body.contains("long break"));
        assert_eq!(completion_message(Mode::ShortBreak, Mode::Focus).0, "Break over");
    }

    #[test]
    fn deferred_start_due_after_delay() {
        let d = DeferredStart::after(1_000, AUTO_START_DELAY_MS);
        assert!(!d.is_due(1_499));
        assert!(d.is_due(1_500));
        assert_eq!(d.remaining_ms(1_200), 300);
        assert_eq!(d.remaining_ms(2_000), 0);
    }
}
