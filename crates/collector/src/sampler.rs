//! Remote host sampler

use crate::history::upgrade_dates;
use crate::inventory::InventoryHosts;
use crate::transport::{CommandRunner, SshSession};
use crate::uptime::parse_uptime;
use crate::{CollectorError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use update_tracker_database::{Database, HostSample};

pub const HISTORY_COMMAND: &str = "zcat -f /var/log/apt/history.log*";
pub const UPTIME_COMMAND: &str = "uptime";

// Extra wall-clock time so ssh can report its own connect timeout first.
const COMMAND_GRACE: Duration = Duration::from_secs(5);

/// Outcome counts of one sampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Whether a host sampled at `last` is still fresh at `now`
pub fn is_recent(now: DateTime<Utc>, last: Option<DateTime<Utc>>, threshold: TimeDelta) -> bool {
    last.is_some_and(|last| now - last < threshold)
}

/// Samples hosts through a [`CommandRunner`]
pub struct Sampler<R> {
    runner: R,
    ssh_timeout: Duration,
}

impl<R: CommandRunner> Sampler<R> {
    /// `ssh_timeout` bounds connection setup; each command gets five seconds more
    pub fn new(runner: R, ssh_timeout: Duration) -> Self {
        Self { runner, ssh_timeout }
    }

    /// Sample one host: last upgrade date and current uptime
    pub async fn sample(&self, hostname: &str, account: &str, keyfile: Option<&Path>) -> Result<HostSample> {
        let session = SshSession::new(hostname, account, keyfile, self.ssh_timeout);

        let history = self.run_checked(&session, HISTORY_COMMAND, "apt history").await?;
        let uptime_text = self.run_checked(&session, UPTIME_COMMAND, "uptime").await?;

        let uptime = parse_uptime(&uptime_text)?;
        let sample_time = Utc::now();
        let today = sample_time.date_naive();

        let mut future_dates = 0;
        let last_update = upgrade_dates(&history)
            .filter(|date| {
                let valid = *date <= today;
                if !valid {
                    future_dates += 1;
                }
                valid
            })
            .max();
        if future_dates > 0 {
            warn!(host = hostname, count = future_dates, "Ignoring upgrade dates later than today");
        }

        debug!(host = hostname, uptime = %uptime, "Parsed uptime");
        Ok(HostSample {
            hostname: hostname.to_string(),
            last_update,
            uptime_days: uptime.as_fractional_days(),
            sample_time,
        })
    }

    /// Sample every inventory host not sampled within `resample_after`
    ///
    /// Per-host failures are logged and counted; a database failure aborts the pass.
    pub async fn collect(
        &self,
        db: &Database,
        inventory: &InventoryHosts,
        resample_after: TimeDelta,
    ) -> Result<RunTally> {
        info!(hosts = inventory.hosts.len(), "Sampling hosts");
        let mut tally = RunTally::default();

        for host in &inventory.hosts {
            debug!(host = host.as_str(), "Checking host");

            let now = Utc::now();
            let last = db.get_last_sample_time(host).await?;
            if is_recent(now, last, resample_after) {
                let hours = last.map(|t| (now - t).num_seconds() as f64 / 3600.0).unwrap_or_default();
                info!("{}: skipped (last sampled {:.1} hours ago)", host, hours);
                tally.skipped += 1;
                continue;
            }

            match self
                .sample(host, &inventory.account, inventory.keyfile.as_deref())
                .await
            {
                Ok(sample) => {
                    db.upsert_host_sample(&sample).await?;
                    let update = sample
                        .last_update
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "never".to_string());
                    info!("{}: update={}, uptime={:.2} days", host, update, sample.uptime_days);
                    tally.processed += 1;
                }
                Err(e) => {
                    error!(host = host.as_str(), error = %e, "Failed to sample host");
                    tally.failed += 1;
                }
            }
        }

        info!(
            processed = tally.processed,
            skipped = tally.skipped,
            failed = tally.failed,
            "Sampling complete"
        );
        Ok(tally)
    }

    async fn run_checked(&self, session: &SshSession, command: &str, what: &str) -> Result<String> {
        let output = self
            .runner
            .run(session, command, self.ssh_timeout + COMMAND_GRACE)
            .await?;

        if !output.success() {
            let status = output
                .exit_code
                .map(|c| format!("exit status {}", c))
                .unwrap_or_else(|| "terminated by signal".to_string());
            return Err(CollectorError::RemoteCommand {
                host: session.host().to_string(),
                reason: format!("failed to get {} ({}): {}", what, status, output.stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}
