//! Boundaries between the timer engine and the host.
//!
//! The engine decides *that* and *when* a completion is announced and
//! recorded; implementations of these traits decide *how*. Every call is
//! best-effort from the engine's point of view: errors are logged and the
//! state machine moves on.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EffectError, Result};
use crate::timer::Mode;

/// A finished interval. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub mode: Mode,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

/// Sound, notification and haptic feedback on completion.
pub trait EffectsPort: Send + Sync {
    fn play_completion_sound(&self) -> Result<(), EffectError>;

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError>;

    /// `pattern` alternates wait/vibrate durations in milliseconds.
    fn vibrate(&self, pattern: &[u64]) -> Result<(), EffectError>;
}

/// Append-only store of completed sessions.
pub trait SessionSink: Send {
    fn record(&mut self, entry: &SessionEntry) -> Result<()>;
}

impl<T: EffectsPort + ?Sized> EffectsPort for Arc<T> {
    fn play_completion_sound(&self) -> Result<(), EffectError> {
        (**self).play_completion_sound()
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError> {
        (**self).notify(title, body)
    }

    fn vibrate(&self, pattern: &[u64]) -> Result<(), EffectError> {
        (**self).vibrate(pattern)
    }
}

/// Effects port for hosts without any feedback channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEffects;

impl EffectsPort for NoopEffects {
    fn play_completion_sound(&self) -> Result<(), EffectError> {
        Ok(())
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<(), EffectError> {
        Ok(())
    }

    fn vibrate(&self, _pattern: &[u64]) -> Result<(), EffectError> {
        Ok(())
    }
}

/// In-memory session history. Clones share the same log, so a host can keep
/// one handle and give another to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionLog {
    entries: Arc<Mutex<Vec<SessionEntry>>>,
}

impl MemorySessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries in insertion order.
    pub fn entries(&self) -> Vec<SessionEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionSink for MemorySessionLog {
    fn record(&mut self, entry: &SessionEntry) -> Result<()> {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(entry.clone());
        Ok(())
    }
}
