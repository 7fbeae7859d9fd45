//! Update Tracker Database Layer
//!
//! SQLite-based storage for the latest sample of each monitored host.

mod models;
mod queries;
mod schema;

pub use models::*;
pub use schema::Database;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid host sample: {0}")]
    InvalidSample(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
