use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod effects;

#[derive(Parser)]
#[command(name = "focusflow", version, about = "FocusFlow session timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer in the foreground
    Run(commands::run::RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Duration presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Completed sessions, most recent first
    History {
        /// Show at most this many sessions
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::History { limit } => commands::stats::history(limit),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "focusflow", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
