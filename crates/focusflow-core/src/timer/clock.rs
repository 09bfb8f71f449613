//! Time sources for the engine.
//!
//! The engine only needs two readings: a monotonic millisecond counter for
//! deferred work and progress interpolation, and UTC wall time to stamp
//! completed sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    fn now_utc(&self) -> DateTime<Utc>;
}

/// Process-local monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-advanced clock for tests and frame-driven hosts.
///
/// Clones share the same time, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.epoch + Duration::milliseconds(self.now_ms() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_shares_time_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance_ms(250);
        other.advance_secs(1);
        assert_eq!(clock.now_ms(), 1250);
        assert_eq!(other.now_ms(), 1250);
    }

    #[test]
    fn manual_clock_wall_time_tracks_offset() {
        let epoch = Utc::now();
        let clock = ManualClock::starting_at(epoch);
        clock.advance_secs(90);
        assert_eq!(clock.now_utc() - epoch, Duration::seconds(90));
    }
}
