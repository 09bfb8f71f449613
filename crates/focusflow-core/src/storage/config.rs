//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timer durations, long-break interval and auto-start flags
//! - Completion feedback preferences (notification, sound, vibration)
//! - The preset catalog
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::settings::{default_presets, find_preset, Preset, Settings, SettingsSource};

/// Completion feedback configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: Settings,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default = "default_presets")]
    pub presets: Vec<Preset>,
    /// File this config was loaded from; `None` keeps it in memory only.
    #[serde(skip)]
    path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
            vibration: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: Settings::default(),
            notifications: NotificationsConfig::default(),
            presets: default_presets(),
            path: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || CoreError::from(ConfigError::UnknownKey(key.to_string()));
        let invalid = |message: String| {
            CoreError::from(ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| invalid(e.to_string()))?,
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Load from `<data dir>/config.toml`, writing defaults if the file
    /// does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable, the file
    /// exists but cannot be parsed, or defaults cannot be written.
    pub fn load() -> Result<Self> {
        Self::load_from(&data_dir()?.join("config.toml"))
    }

    /// # Errors
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut cfg: Config = toml::from_str(&content)?;
                cfg.timer.validate().map_err(|e| ConfigError::InvalidValue {
                    key: "timer".into(),
                    message: e.to_string(),
                })?;
                cfg.path = Some(path.to_path_buf());
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self {
                    path: Some(path.to_path_buf()),
                    ..Self::default()
                };
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from disk, falling back to in-memory defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist to the file this config was loaded from. A config without a
    /// backing file is not written anywhere.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key and save.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value does not parse,
    /// the resulting timer settings are invalid, or saving fails.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config = serde_json::from_value(json)?;
        updated.timer.validate().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.path = self.path.take();
        *self = updated;
        self.save()
    }

    /// Restore every section to its default and save to the same file.
    ///
    /// # Errors
    /// Returns an error if saving fails.
    pub fn reset(&mut self) -> Result<()> {
        *self = Self {
            path: self.path.take(),
            ..Self::default()
        };
        self.save()
    }

    /// Look up a preset in this config's catalog.
    ///
    /// # Errors
    /// Returns `UnknownPreset` if no preset has this name.
    pub fn preset(&self, name: &str) -> Result<&Preset> {
        Ok(find_preset(&self.presets, name)?)
    }
}

impl SettingsSource for Config {
    fn get(&self) -> Settings {
        self.timer.clone()
    }

    /// Applies in memory first; a failed save is logged and the new
    /// settings stay in effect for this process.
    fn replace(&mut self, settings: Settings) -> Result<()> {
        self.timer = settings;
        if let Err(e) = self.save() {
            warn!(error = %e, "failed to persist timer settings");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer, cfg.timer);
        assert_eq!(parsed.notifications, cfg.notifications);
        assert_eq!(parsed.presets, cfg.presets);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.work_minutes").as_deref(), Some("25"));
        assert_eq!(cfg.get("notifications.sound").as_deref(), Some("true"));
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "timer.auto_start_break", "false").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "timer.auto_start_break").unwrap(),
            &serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "timer.long_break_interval", "3").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "timer.long_break_interval").unwrap(),
            &serde_json::Value::Number(3.into())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "timer.nonexistent_key", "1");
        assert!(matches!(
            result,
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "notifications.sound", "loud");
        assert!(result.is_err());
    }

    #[test]
    fn set_rejects_zero_duration() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.work_minutes", "0").is_err());
        assert_eq!(cfg.timer.work_minutes, 25);
    }

    #[test]
    fn load_writes_defaults_then_reads_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        cfg.set("timer.work_minutes", "40").unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.timer.work_minutes, 40);
        assert_eq!(reloaded.path(), Some(path.as_path()));
    }

    #[test]
    fn load_rejects_invalid_timer_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timer]\nlong_break_interval = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn replace_persists_through_settings_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::load_from(&path).unwrap();
        let preset = cfg.preset("deep work").unwrap().clone();
        let settings = SettingsSource::get(&cfg).with_preset(&preset);
        cfg.replace(settings).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.timer.work_minutes, 50);
        assert_eq!(reloaded.timer.long_break_minutes, 20);
    }

    #[test]
    fn reset_restores_defaults_in_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::load_from(&path).unwrap();
        cfg.set("notifications.sound", "false").unwrap();
        cfg.reset().unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert!(reloaded.notifications.sound);
        assert_eq!(reloaded.path(), Some(path.as_path()));
    }
}
