//! Integration tests for session persistence.
//!
//! Runs the engine against the SQLite store and the TOML config, from
//! completed intervals to the statistics a host would display.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use focusflow_core::{
    Config, Database, EffectError, EffectsPort, Event, ManualClock, Mode, SessionEntry,
    SessionSink, SettingsSource, TimerEngine,
};
use focusflow_core::timer::SystemClock;

#[derive(Default)]
struct CountingEffects {
    sounds: AtomicUsize,
    notifications: AtomicUsize,
    vibrations: AtomicUsize,
}

impl EffectsPort for CountingEffects {
    fn play_completion_sound(&self) -> Result<(), EffectError> {
        self.sounds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<(), EffectError> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        Err(EffectError::Unsupported("notification"))
    }

    fn vibrate(&self, _pattern: &[u64]) -> Result<(), EffectError> {
        self.vibrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn tiny_config() -> Config {
    let mut cfg = Config::default();
    cfg.timer.work_minutes = 1;
    cfg.timer.short_break_minutes = 1;
    cfg.timer.long_break_minutes = 1;
    cfg.timer.long_break_interval = 2;
    cfg.timer.auto_start_break = false;
    cfg.timer.auto_start_pomodoro = false;
    cfg
}

fn finish_interval(engine: &mut TimerEngine, clock: &ManualClock) {
    engine.start();
    loop {
        clock.advance_secs(1);
        if engine.tick().is_some() {
            return;
        }
    }
}

#[test]
fn completed_sessions_land_in_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("focusflow.db");
    let effects = Arc::new(CountingEffects::default());
    let clock = ManualClock::new();

    let mut engine = TimerEngine::new(
        tiny_config(),
        Arc::clone(&effects),
        Database::open_at(&db_path).unwrap(),
    )
    .with_clock(clock.clone());

    for _ in 0..4 {
        finish_interval(&mut engine, &clock);
    }

    // Notification failures are swallowed; every effect is still attempted.
    assert_eq!(effects.sounds.load(Ordering::SeqCst), 4);
    assert_eq!(effects.notifications.load(Ordering::SeqCst), 4);
    assert_eq!(effects.vibrations.load(Ordering::SeqCst), 4);

    let db = Database::open_at(&db_path).unwrap();
    let history = db.history(None).unwrap();
    let modes: Vec<Mode> = history.iter().rev().map(|r| r.mode).collect();
    assert_eq!(
        modes,
        vec![Mode::Focus, Mode::ShortBreak, Mode::Focus, Mode::LongBreak]
    );

    let stats = db.stats_all().unwrap();
    assert_eq!(stats.total_sessions, 4);
    assert_eq!(stats.completed_pomodoros, 2);
    assert_eq!(stats.total_focus_min, 2);
    assert_eq!(stats.total_break_min, 2);
}

struct UnavailableStorage;

impl SessionSink for UnavailableStorage {
    fn record(&mut self, _entry: &SessionEntry) -> focusflow_core::error::Result<()> {
        Err(focusflow_core::CoreError::Custom("disk full".into()))
    }
}

#[test]
fn persistence_failure_does_not_roll_back_cycle() {
    let clock = ManualClock::new();
    let mut engine = TimerEngine::new(
        tiny_config(),
        focusflow_core::NoopEffects,
        UnavailableStorage,
    )
    .with_clock(clock.clone());

    engine.start();
    let mut completed = None;
    while completed.is_none() {
        clock.advance_secs(1);
        completed = engine.tick();
    }
    assert!(matches!(
        completed,
        Some(Event::TimerCompleted {
            recorded: false,
            cycles_completed: 1,
            ..
        })
    ));
    assert_eq!(engine.cycles_completed(), 1);
    assert_eq!(engine.mode(), Mode::ShortBreak);
}

#[test]
fn preset_from_config_catalog_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let config = Config::load_from(&path).unwrap();
    let preset = config.preset("Quick Pomodoro").unwrap().clone();

    let mut engine = TimerEngine::new(
        config,
        focusflow_core::NoopEffects,
        focusflow_core::MemorySessionLog::new(),
    )
    .with_clock(SystemClock::new());
    engine.apply_preset(&preset).unwrap();
    assert_eq!(engine.total_secs(), 15 * 60);

    let reloaded = Config::load_from(&path).unwrap();
    let settings = SettingsSource::get(&reloaded);
    assert_eq!(settings.work_minutes, 15);
    assert_eq!(settings.short_break_minutes, 3);
    assert_eq!(settings.long_break_minutes, 10);
}
