//! Timer settings, presets and the read side the engine consumes.
//!
//! The engine never holds settings across an interval: it takes a fresh
//! snapshot through [`SettingsSource::get`] every time it needs a duration
//! or a transition decision.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Durations and auto-start behaviour of the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Focus intervals per long break.
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_true")]
    pub auto_start_break: bool,
    #[serde(default = "default_true")]
    pub auto_start_pomodoro: bool,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_long_break_interval() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_interval: default_long_break_interval(),
            auto_start_break: true,
            auto_start_pomodoro: true,
        }
    }
}

impl Settings {
    /// Reject zero durations and a zero long-break interval.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidSettings`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks = [
            ("work_minutes", self.work_minutes),
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
            ("long_break_interval", self.long_break_interval),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ValidationError::InvalidSettings { field });
            }
        }
        Ok(())
    }

    /// Copy of these settings with the preset's durations.
    /// Interval and auto-start flags are kept.
    pub fn with_preset(&self, preset: &Preset) -> Self {
        Self {
            work_minutes: preset.work,
            short_break_minutes: preset.short,
            long_break_minutes: preset.long,
            ..self.clone()
        }
    }
}

/// A named set of interval durations, in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub work: u32,
    pub short: u32,
    pub long: u32,
}

impl Preset {
    pub fn new(name: impl Into<String>, work: u32, short: u32, long: u32) -> Self {
        Self {
            name: name.into(),
            work,
            short,
            long,
        }
    }

    /// # Errors
    /// Returns [`ValidationError::InvalidPreset`] if any duration is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("work", self.work), ("short", self.short), ("long", self.long)] {
            if value == 0 {
                return Err(ValidationError::InvalidPreset {
                    name: self.name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Built-in preset catalog.
pub fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new("Classic Focus", 25, 5, 15),
        Preset::new("Deep Work", 50, 10, 20),
        Preset::new("Quick Pomodoro", 15, 3, 10),
        Preset::new("Long Focus", 45, 15, 30),
        Preset::new("Student Mode", 20, 5, 15),
    ]
}

/// Case-insensitive lookup by name.
///
/// # Errors
/// Returns [`ValidationError::UnknownPreset`] if no preset matches.
pub fn find_preset<'a>(presets: &'a [Preset], name: &str) -> Result<&'a Preset, ValidationError> {
    presets
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ValidationError::UnknownPreset(name.to_string()))
}

/// Where the engine reads its settings from.
pub trait SettingsSource: Send {
    /// Current settings snapshot.
    fn get(&self) -> Settings;

    /// Overwrite the stored settings. Called by preset application and
    /// explicit settings updates after validation has passed.
    fn replace(&mut self, settings: Settings) -> Result<()>;
}

/// Settings held in memory only.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    settings: Settings,
}

impl InMemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl SettingsSource for InMemorySettings {
    fn get(&self) -> Settings {
        self.settings.clone()
    }

    fn replace(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        Ok(())
    }
}
