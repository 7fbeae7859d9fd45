//! Terminal output of `update-manage`

use chrono::{DateTime, Utc};
use std::fmt::{self, Write};
use update_tracker_database::HostSample;

const TABLE_WIDTH: usize = 67;

/// Outcome line for `--delete`
pub fn render_delete(out: &mut impl Write, hostname: &str, deleted: bool) -> fmt::Result {
    if deleted {
        writeln!(out, "✓ Deleted {} from database", hostname)
    } else {
        writeln!(out, "✗ Host {} not found in database", hostname)
    }
}

/// Table of stored samples for `--list`, ages relative to `now`
pub fn render_list(out: &mut impl Write, samples: &[HostSample], now: DateTime<Utc>) -> fmt::Result {
    writeln!(out, "{:<30} {:<12} {:>10} {:>12}", "HOSTNAME", "LAST UPDATE", "UPTIME", "SAMPLED")?;
    writeln!(out, "{}", "-".repeat(TABLE_WIDTH))?;

    for sample in samples {
        let last_update = sample
            .last_update
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string());
        let age_hours = sample.age(now).num_minutes() as f64 / 60.0;
        writeln!(
            out,
            "{:<30} {:<12} {:>9.1}d {:>11.1}h",
            sample.hostname, last_update, sample.uptime_days, age_hours
        )?;
    }

    if samples.is_empty() {
        writeln!(out, "No hosts sampled yet. Run 'update-sample' first.")?;
    }
    Ok(())
}
