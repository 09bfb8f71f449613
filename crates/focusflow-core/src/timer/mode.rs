use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Focus,
    ShortBreak,
    LongBreak,
}

/// Where a finished interval leads, and whether the next one should start
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Mode,
    pub auto_start: bool,
}

impl Mode {
    /// Configured duration in minutes for this mode.
    pub fn duration_min(self, settings: &Settings) -> u32 {
        match self {
            Mode::Focus => settings.work_minutes,
            Mode::ShortBreak => settings.short_break_minutes,
            Mode::LongBreak => settings.long_break_minutes,
        }
    }

    /// Configured duration in seconds.
    ///
    /// Never zero: a zero-minute setting that slipped past validation is
    /// treated as one minute so `total_secs` stays positive.
    pub fn duration_secs(self, settings: &Settings) -> u64 {
        u64::from(self.duration_min(settings).max(1)).saturating_mul(60)
    }

    pub fn is_break(self) -> bool {
        !matches!(self, Mode::Focus)
    }

    /// Transition taken when an interval of this mode completes.
    ///
    /// `cycles_completed` must already include the interval that just
    /// finished when `self` is `Focus`.
    pub fn transition(self, cycles_completed: u64, settings: &Settings) -> Transition {
        match self {
            Mode::Focus => {
                let interval = u64::from(settings.long_break_interval.max(1));
                let next = if cycles_completed % interval == 0 {
                    Mode::LongBreak
                } else {
                    Mode::ShortBreak
                };
                Transition {
                    next,
                    auto_start: settings.auto_start_break,
                }
            }
            Mode::ShortBreak | Mode::LongBreak => Transition {
                next: Mode::Focus,
                auto_start: settings.auto_start_pomodoro,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    /// Stable storage key, matches the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Focus => "focus",
            Mode::ShortBreak => "short_break",
            Mode::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(Mode::Focus),
            "short_break" => Some(Mode::ShortBreak),
            "long_break" => Some(Mode::LongBreak),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_follow_settings() {
        let s = Settings::default();
        assert_eq!(Mode::Focus.duration_secs(&s), 25 * 60);
        assert_eq!(Mode::ShortBreak.duration_secs(&s), 5 * 60);
        assert_eq!(Mode::LongBreak.duration_secs(&s), 15 * 60);
    }

    #[test]
    fn zero_minutes_never_yields_zero_total() {
        let s = Settings {
            short_break_minutes: 0,
            ..Settings::default()
        };
        assert_eq!(Mode::ShortBreak.duration_secs(&s), 60);
    }

    #[test]
    fn every_fourth_focus_leads_to_long_break() {
        let s = Settings::default();
        let nexts: Vec<Mode> = (1..=8)
            .map(|cycle| Mode::Focus.transition(cycle, &s).next)
            .collect();
        assert_eq!(
            nexts,
            vec![
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::LongBreak,
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::LongBreak,
            ]
        );
    }

    #[test]
    fn breaks_return_to_focus_with_pomodoro_flag() {
        let s = Settings {
            auto_start_break: true,
            auto_start_pomodoro: false,
            ..Settings::default()
        };
        let t = Mode::LongBreak.transition(4, &s);
        assert_eq!(t.next, Mode::Focus);
        assert!(!t.auto_start);
        assert!(Mode::Focus.transition(1, &s).auto_start);
    }

    #[test]
    fn storage_key_roundtrips() {
        for mode in [Mode::Focus, Mode::ShortBreak, Mode::LongBreak] {
            assert_eq!(Mode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::parse("break"), None);
    }
}
