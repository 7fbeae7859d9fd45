//! Update Tracker Data Collectors
//!
//! Samples remote hosts over SSH (package upgrade history, uptime) and
//! stores the latest observation per host.

pub mod history;
pub mod inventory;
pub mod sampler;
pub mod transport;
pub mod uptime;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Remote command failed on {host}: {reason}")]
    RemoteCommand { host: String, reason: String },

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] update_tracker_database::DatabaseError),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
