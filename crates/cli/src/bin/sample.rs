//! Samples every inventory host that was not sampled recently

use anyhow::Result;
use clap::Parser;
use tracing::info;
use update_tracker_cli::{CommonArgs, ConfigError};
use update_tracker_collector::inventory::{AnsibleInventory, Inventory};
use update_tracker_collector::sampler::Sampler;
use update_tracker_collector::transport::OpenSsh;
use update_tracker_database::Database;

#[derive(Parser)]
#[command(name = "update-sample")]
#[command(about = "Record last package upgrade and uptime of inventory hosts")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.common.init()?;
    let ansible = config.ansible()?;
    let cutoffs = config.cutoffs()?;

    let db = Database::connect(&config.data).await?;

    let inventory = AnsibleInventory::new(&ansible.config)
        .resolve(&ansible.inventory)
        .await?;
    info!("Found {} hosts", inventory.hosts.len());

    if let Some(ref keyfile) = inventory.keyfile {
        if !keyfile.is_file() {
            return Err(ConfigError::Invalid(format!("SSH key file not found: {}", keyfile.display())).into());
        }
    }

    let sampler = Sampler::new(OpenSsh::new(), cutoffs.ssh_timeout());
    let tally = sampler
        .collect(&db, &inventory, cutoffs.resample_after())
        .await?;
    db.close().await;

    info!(
        "Processed {} hosts, skipped {} hosts, failed {} hosts",
        tally.processed, tally.skipped, tally.failed
    );
    Ok(())
}
