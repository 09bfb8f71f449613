use clap::Subcommand;
use focusflow_core::storage::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    let stats = match action {
        StatsAction::Today => db.stats_today()?,
        StatsAction::All => db.stats_all()?,
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub fn history(limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let sessions = db.history(limit)?;
    println!("{}", serde_json::to_string_pretty(&sessions)?);
    Ok(())
}
