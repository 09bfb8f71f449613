mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, NotificationsConfig};
pub use database::{Database, SessionRecord, Stats};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the directory holding `config.toml` and `focusflow.db`.
///
/// `FOCUSFLOW_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/focusflow[-dev]/`, with the `-dev` suffix when
/// `FOCUSFLOW_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSFLOW_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusflow-dev")
            } else {
                base_dir.join("focusflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
