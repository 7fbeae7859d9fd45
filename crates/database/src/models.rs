//! Database models for Update Tracker

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Latest observation of a single host, keyed by hostname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HostSample {
    pub hostname: String,
    /// Date of the most recent package upgrade, `None` if history shows none
    pub last_update: Option<NaiveDate>,
    pub uptime_days: f64,
    pub sample_time: DateTime<Utc>,
}

impl HostSample {
    /// Age of this sample relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::TimeDelta {
        now - self.sample_time
    }
}
