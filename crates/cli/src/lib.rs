//! Update Tracker CLI
//!
//! Shared plumbing for the `update-sample`, `update-report` and
//! `update-manage` binaries.

pub mod config;
pub mod manage;
pub mod report;

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub use config::{Config, ConfigError};

pub const DEFAULT_CONFIG: &str = "/etc/update-tracker/config.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(alias = "critical")]
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Options accepted by every binary
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Logging level
    #[arg(short, long, value_enum, ignore_case = true, default_value = "warn")]
    pub loglevel: LogLevel,

    /// YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG)]
    pub yaml: PathBuf,
}

impl CommonArgs {
    /// Initialize logging to stderr and load the configuration
    pub fn init(&self) -> Result<Config, ConfigError> {
        init_logging(self.loglevel);
        Config::load(&self.yaml)
    }
}

pub fn init_logging(level: LogLevel) {
    FmtSubscriber::builder()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
