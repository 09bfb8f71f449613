//! Completion feedback for a terminal host.

use std::io::Write;

use focusflow_core::storage::NotificationsConfig;
use focusflow_core::{EffectError, EffectsPort};
use tracing::{debug, info};

/// Terminal bell for sound, a stderr line for notifications. Terminals
/// have no vibration motor, so vibration is a logged no-op.
pub struct TerminalEffects {
    prefs: NotificationsConfig,
}

impl TerminalEffects {
    pub fn new(prefs: NotificationsConfig) -> Self {
        Self { prefs }
    }
}

impl EffectsPort for TerminalEffects {
    fn play_completion_sound(&self) -> Result<(), EffectError> {
        if !self.prefs.sound {
            return Ok(());
        }
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| EffectError::Failed {
                effect: "sound",
                message: e.to_string(),
            })
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), EffectError> {
        if !self.prefs.enabled {
            return Ok(());
        }
        info!(title, body, "notification");
        writeln!(std::io::stderr(), "\n[{title}] {body}").map_err(|e| EffectError::Failed {
            effect: "notification",
            message: e.to_string(),
        })
    }

    fn vibrate(&self, pattern: &[u64]) -> Result<(), EffectError> {
        if self.prefs.vibration {
            debug!(?pattern, "vibration requested; terminal has no haptics");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_effects_succeed_silently() {
        let fx = TerminalEffects::new(NotificationsConfig {
            enabled: false,
            sound: false,
            vibration: false,
        });
        assert!(fx.play_completion_sound().is_ok());
        assert!(fx.notify("Focus complete", "Time for a short break.").is_ok());
        assert!(fx.vibrate(&[0, 250]).is_ok());
    }
}
