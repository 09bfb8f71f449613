//! # FocusFlow Core Library
//!
//! This library provides the core logic for the FocusFlow session timer:
//! alternating focus and break intervals, counting completed cycles toward a
//! long break, and recording every finished session.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine. The host calls `tick()`
//!   once per second while the timer runs; the engine owns every transition
//!   and the completion sequence
//! - **Progress Clock**: Maps the countdown to a 0..1 fraction and
//!   interpolates between ticks for smooth rendering
//! - **Ports**: Traits for completion effects, session persistence and
//!   settings, so hosts decide how feedback is delivered
//! - **Storage**: SQLite session history and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`]: Tokio task that ticks an engine and serializes commands
//! - [`Database`]: Session history and statistics
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod ports;
pub mod settings;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, EffectError, ValidationError};
pub use events::Event;
pub use ports::{EffectsPort, MemorySessionLog, NoopEffects, SessionEntry, SessionSink};
pub use settings::{default_presets, InMemorySettings, Preset, Settings, SettingsSource};
pub use storage::{Config, Database, SessionRecord, Stats};
pub use timer::{
    Clock, ManualClock, Mode, ProgressClock, SystemClock, TimerDriver, TimerEngine, TimerHandle,
    TimerState, TokioClock,
};
