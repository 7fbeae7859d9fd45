//! Prints hosts that exceed the configured uptime and update limits

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use update_tracker_analyzer::Analyzer;
use update_tracker_cli::{report, CommonArgs};
use update_tracker_database::Database;

#[derive(Parser)]
#[command(name = "update-report")]
#[command(about = "Report hosts with excessive uptime or outdated package upgrades")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.common.init()?;
    let thresholds = config.cutoffs()?.thresholds();

    let db = Database::connect(&config.data).await?;
    let generated = Utc::now();
    let overdue = Analyzer::overdue(&db, &thresholds).await?;
    db.close().await;

    let mut out = String::new();
    report::render(&mut out, overdue, &thresholds, generated)?;
    print!("{}", out);

    Ok(())
}
