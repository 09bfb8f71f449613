//! Countdown-to-progress mapping for visual indicators.
//!
//! The discrete fraction moves once per tick. Hosts that animate (a ring
//! filling up, a progress bar) sample [`ProgressClock::sample`] at frame rate
//! instead: while the timer runs it interpolates from the fraction captured
//! at start towards 1.0 over the remaining wall time, and while paused it
//! holds the last discrete value.

use serde::{Deserialize, Serialize};

/// `1 - remaining / total`, clamped to `[0, 1]`.
///
/// Exactly 0.0 when `remaining == total` and exactly 1.0 when `remaining == 0`.
pub fn progress_fraction(remaining_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    (1.0 - remaining_secs as f64 / total_secs as f64).clamp(0.0, 1.0)
}

/// Captured when the timer becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressAnchor {
    /// Discrete fraction at the moment the timer started.
    pub from_fraction: f64,
    /// Seconds left at start; the interpolation reaches 1.0 after this long.
    pub remaining_secs: u64,
    /// Monotonic start time from the engine's clock.
    pub started_at_ms: u64,
}

impl ProgressAnchor {
    pub fn fraction_at(&self, now_ms: u64) -> f64 {
        if self.remaining_secs == 0 {
            return 1.0;
        }
        let span_ms = self.remaining_secs.saturating_mul(1000) as f64;
        let elapsed_ms = now_ms.saturating_sub(self.started_at_ms) as f64;
        let t = (elapsed_ms / span_ms).min(1.0);
        (self.from_fraction + (1.0 - self.from_fraction) * t).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressClock {
    anchor: Option<ProgressAnchor>,
    /// Last discrete fraction pushed by the engine.
    last: f64,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer became active. Returns the anchor hosts interpolate from.
    pub fn on_start(&mut self, remaining_secs: u64, total_secs: u64, now_ms: u64) -> ProgressAnchor {
        self.last = progress_fraction(remaining_secs, total_secs);
        let anchor = ProgressAnchor {
            from_fraction: self.last,
            remaining_secs,
            started_at_ms: now_ms,
        };
        self.anchor = Some(anchor);
        anchor
    }

    /// Timer paused: drop the anchor and freeze at the discrete value.
    pub fn on_pause(&mut self, remaining_secs: u64, total_secs: u64) {
        self.anchor = None;
        self.last = progress_fraction(remaining_secs, total_secs);
    }

    pub fn on_tick(&mut self, remaining_secs: u64, total_secs: u64) {
        self.last = progress_fraction(remaining_secs, total_secs);
    }

    /// A new interval was entered (completion, reset, preset, settings).
    pub fn on_interval(&mut self, remaining_secs: u64, total_secs: u64) {
        self.on_pause(remaining_secs, total_secs);
    }

    pub fn anchor(&self) -> Option<ProgressAnchor> {
        self.anchor
    }

    /// Last discrete fraction.
    pub fn fraction(&self) -> f64 {
        self.last
    }

    /// Smooth fraction for rendering at `now_ms`. Never runs backwards past
    /// the last discrete value.
    pub fn sample(&self, now_ms: u64) -> f64 {
        match self.anchor {
            Some(anchor) => anchor.fraction_at(now_ms).max(self.last),
            None => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_endpoints_are_exact() {
        assert_eq!(progress_fraction(1500, 1500), 0.0);
        assert_eq!(progress_fraction(0, 1500), 1.0);
        assert_eq!(progress_fraction(750, 1500), 0.5);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(progress_fraction(2000, 1500), 0.0);
        assert_eq!(progress_fraction(10, 0), 0.0);
    }

    #[test]
    fn anchor_interpolates_to_one_over_remaining_time() {
        let mut clock = ProgressClock::new();
        let anchor = clock.on_start(100, 200, 1_000);
        assert_eq!(anchor.from_fraction, 0.5);
        assert_eq!(clock.sample(1_000), 0.5);
        assert!((clock.sample(51_000) - 0.75).abs() < 1e-9);
        assert_eq!(clock.sample(101_000), 1.0);
        assert_eq!(clock.sample(500_000), 1.0);
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = ProgressClock::new();
        clock.on_start(60, 60, 0);
        clock.on_tick(30, 60);
        clock.on_pause(30, 60);
        assert!(clock.anchor().is_none());
        assert_eq!(clock.sample(10_000), 0.5);
        assert_eq!(clock.sample(1_000_000), 0.5);
    }

    #[test]
    fn sample_never_falls_behind_discrete_value() {
        let mut clock = ProgressClock::new();
        clock.on_start(10, 10, 0);
        // Ticks arrived faster than wall time.
        clock.on_tick(5, 10);
        assert_eq!(clock.sample(1_000), 0.5);
    }
}
