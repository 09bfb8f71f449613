use clap::Subcommand;
use focusflow_core::Config;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List the preset catalog
    List,
    /// Make a preset's durations the configured timer durations
    Apply {
        /// Preset name, case-insensitive (e.g. "Deep Work")
        name: String,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    match action {
        PresetAction::List => {
            println!("{}", serde_json::to_string_pretty(&config.presets)?);
        }
        PresetAction::Apply { name } => {
            let preset = config.preset(&name)?.clone();
            preset.validate()?;
            config.timer = config.timer.with_preset(&preset);
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&config.timer)?);
        }
    }
    Ok(())
}
