//! Terminal rendering of the overdue report

use chrono::{DateTime, Utc};
use std::fmt::{self, Write};
use update_tracker_analyzer::{Overdue, Thresholds};

const RULE_WIDTH: usize = 70;

/// Render the report; `overdue` is sorted before printing
pub fn render(
    out: &mut impl Write,
    overdue: Overdue,
    thresholds: &Thresholds,
    generated: DateTime<Utc>,
) -> fmt::Result {
    let overdue = overdue.sorted();
    let rule = "=".repeat(RULE_WIDTH);
    let uptime_limit = thresholds.uptime_days;
    let update_limit = thresholds.update_days;

    writeln!(out, "{}", rule)?;
    writeln!(out, "UPDATE TRACKER REPORT")?;
    writeln!(out, "Generated: {}", generated.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "Uptime limit: {} days", uptime_limit)?;
    writeln!(out, "Update limit: {} days", update_limit)?;
    writeln!(out, "{}", rule)?;

    if overdue.uptime.is_empty() {
        writeln!(out, "\n✓ No servers with excessive uptime (>{} days)", uptime_limit)?;
    } else {
        writeln!(out, "\n⚠️  Servers with excessive uptime (>{} days):", uptime_limit)?;
        for issue in &overdue.uptime {
            writeln!(out, "  • {}: {:.1} days", issue.hostname, issue.uptime_days)?;
        }
    }

    if overdue.never_updated.is_empty() {
        writeln!(out, "\n✓ No servers without update history")?;
    } else {
        writeln!(out, "\n⚠️  Servers never updated:")?;
        for hostname in &overdue.never_updated {
            writeln!(out, "  • {}", hostname)?;
        }
    }

    if overdue.outdated.is_empty() {
        writeln!(out, "\n✓ No servers with outdated updates (>{} days)", update_limit)?;
    } else {
        writeln!(out, "\n⚠️  Servers with outdated updates (>{} days):", update_limit)?;
        for issue in &overdue.outdated {
            writeln!(
                out,
                "  • {}: last updated {} ({} days ago)",
                issue.hostname, issue.last_update, issue.days_since
            )?;
        }
    }

    writeln!(out, "\n{}", rule)?;
    match overdue.total() {
        0 => writeln!(out, "TOTAL: All servers are up to date!")?,
        n => writeln!(out, "TOTAL: {} server(s) require attention", n)?,
    }
    writeln!(out, "{}", rule)
}
