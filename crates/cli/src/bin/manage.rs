//! Maintenance of the host sample store

use anyhow::Result;
use chrono::Utc;
use clap::{ArgGroup, Parser};
use tracing::{info, warn};
use update_tracker_cli::{manage, CommonArgs};
use update_tracker_database::Database;

#[derive(Parser)]
#[command(name = "update-manage")]
#[command(about = "Manage the update tracker database")]
#[command(version)]
#[command(group(ArgGroup::new("action").required(true).args(["delete", "list"])))]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Remove this hostname from the database
    #[arg(long, value_name = "HOSTNAME")]
    delete: Option<String>,

    /// List stored host samples
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.common.init()?;

    let db = Database::connect(&config.data).await?;
    let mut out = String::new();

    if let Some(ref hostname) = cli.delete {
        let deleted = db.delete_host_sample(hostname).await?;
        if deleted {
            info!("Deleted {}", hostname);
        } else {
            warn!("Host {} not found", hostname);
        }
        manage::render_delete(&mut out, hostname, deleted)?;
    }
    if cli.list {
        let samples = db.get_host_samples().await?;
        manage::render_list(&mut out, &samples, Utc::now())?;
    }

    db.close().await;
    print!("{}", out);
    Ok(())
}
