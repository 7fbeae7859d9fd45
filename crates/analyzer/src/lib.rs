//! Update Tracker Staleness Analyzer
//!
//! Classifies stored host samples into overdue categories.

use chrono::{Days, NaiveDate, Utc};
use thiserror::Error;
use tracing::info;
use update_tracker_database::{Database, HostSample};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Database error: {0}")]
    Database(#[from] update_tracker_database::DatabaseError),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Limits beyond which a host needs attention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Maximum acceptable uptime (exclusive)
    pub uptime_days: f64,
    /// Maximum age of the last package upgrade
    pub update_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UptimeIssue {
    pub hostname: String,
    pub uptime_days: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedUpdate {
    pub hostname: String,
    pub last_update: NaiveDate,
    pub days_since: i64,
}

/// Hosts violating the thresholds, by category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overdue {
    pub uptime: Vec<UptimeIssue>,
    pub never_updated: Vec<String>,
    pub outdated: Vec<OutdatedUpdate>,
}

impl Overdue {
    pub fn total(&self) -> usize {
        self.uptime.len() + self.never_updated.len() + self.outdated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Worst first: longest uptime, oldest update; never-updated by name
    pub fn sorted(mut self) -> Self {
        self.uptime
            .sort_by(|a, b| b.uptime_days.total_cmp(&a.uptime_days).then_with(|| a.hostname.cmp(&b.hostname)));
        self.never_updated.sort();
        self.outdated
            .sort_by(|a, b| b.days_since.cmp(&a.days_since).then_with(|| a.hostname.cmp(&b.hostname)));
        self
    }
}

/// Classify samples against `thresholds` as of `today`
///
/// Uptime is checked independently of the update history. A host with no
/// recorded upgrade is never-updated and is not also checked for age.
pub fn classify(samples: &[HostSample], thresholds: &Thresholds, today: NaiveDate) -> Overdue {
    let cutoff = today
        .checked_sub_days(Days::new(thresholds.update_days as u64))
        .unwrap_or(NaiveDate::MIN);
    let mut overdue = Overdue::default();

    for sample in samples {
        if sample.uptime_days > thresholds.uptime_days {
            overdue.uptime.push(UptimeIssue {
                hostname: sample.hostname.clone(),
                uptime_days: sample.uptime_days,
            });
        }

        match sample.last_update {
            None => overdue.never_updated.push(sample.hostname.clone()),
            Some(last_update) if last_update < cutoff => overdue.outdated.push(OutdatedUpdate {
                hostname: sample.hostname.clone(),
                last_update,
                days_since: (today - last_update).num_days(),
            }),
            Some(_) => {}
        }
    }

    overdue
}

/// Staleness analyzer over the sample store
pub struct Analyzer;

impl Analyzer {
    /// Classify every stored sample as of today (UTC)
    pub async fn overdue(db: &Database, thresholds: &Thresholds) -> Result<Overdue> {
        let samples = db.get_host_samples().await?;
        let overdue = classify(&samples, thresholds, Utc::now().date_naive());

        info!(
            hosts = samples.len(),
            uptime = overdue.uptime.len(),
            never_updated = overdue.never_updated.len(),
            outdated = overdue.outdated.len(),
            "Classified host samples"
        );
        Ok(overdue)
    }
}
