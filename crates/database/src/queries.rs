//! Database query functions

use crate::models::*;
use crate::schema::Database;
use crate::{DatabaseError, Result};
use chrono::{DateTime, Utc};

impl Database {
    // ==================== Host Samples ====================

    /// Get the time a host was last sampled, `None` if it never was
    pub async fn get_last_sample_time(&self, hostname: &str) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT sample_time FROM host_updates WHERE hostname = ?")
                .bind(hostname)
                .fetch_optional(self.pool())
                .await?;

        Ok(row.map(|(sample_time,)| sample_time))
    }

    /// Get the stored sample for one host
    pub async fn get_host_sample(&self, hostname: &str) -> Result<Option<HostSample>> {
        let row = sqlx::query_as::<_, HostSample>(
            "SELECT hostname, last_update, uptime_days, sample_time
             FROM host_updates WHERE hostname = ?",
        )
        .bind(hostname)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Get all stored samples, ordered by hostname
    pub async fn get_host_samples(&self) -> Result<Vec<HostSample>> {
        let rows = sqlx::query_as::<_, HostSample>(
            "SELECT hostname, last_update, uptime_days, sample_time
             FROM host_updates ORDER BY hostname",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Insert a sample, replacing any previous row for the same host
    pub async fn upsert_host_sample(&self, sample: &HostSample) -> Result<()> {
        if sample.hostname.is_empty() {
            return Err(DatabaseError::InvalidSample("empty hostname".to_string()));
        }
        if !sample.uptime_days.is_finite() || sample.uptime_days < 0.0 {
            return Err(DatabaseError::InvalidSample(format!(
                "{}: uptime_days must be a non-negative number, got {}",
                sample.hostname, sample.uptime_days
            )));
        }

        sqlx::query(
            "INSERT INTO host_updates (hostname, last_update, uptime_days, sample_time)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(hostname) DO UPDATE SET
                 last_update = excluded.last_update,
                 uptime_days = excluded.uptime_days,
                 sample_time = excluded.sample_time",
        )
        .bind(&sample.hostname)
        .bind(sample.last_update)
        .bind(sample.uptime_days)
        .bind(sample.sample_time)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Delete a host's sample, returning whether a row existed
    pub async fn delete_host_sample(&self, hostname: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM host_updates WHERE hostname = ?")
            .bind(hostname)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
