//! YAML configuration file

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use update_tracker_analyzer::Thresholds;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing config key: {0}")]
    Missing(&'static str),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ansible: Option<AnsibleSection>,
    /// Path of the SQLite sample store
    pub data: PathBuf,
    pub cutoffs: Option<Cutoffs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnsibleSection {
    /// Path of ansible.cfg
    pub config: PathBuf,
    /// Group or host names to sample
    #[serde(deserialize_with = "one_or_many")]
    pub inventory: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cutoffs {
    #[serde(rename = "ssh seconds")]
    pub ssh_seconds: u64,
    #[serde(rename = "sample hours")]
    pub sample_hours: f64,
    #[serde(rename = "uptime days")]
    pub uptime_days: f64,
    #[serde(rename = "update days")]
    pub update_days: u32,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(ref cutoffs) = config.cutoffs {
            cutoffs.validate()?;
        }
        Ok(config)
    }

    pub fn ansible(&self) -> Result<&AnsibleSection, ConfigError> {
        self.ansible.as_ref().ok_or(ConfigError::Missing("ansible"))
    }

    pub fn cutoffs(&self) -> Result<&Cutoffs, ConfigError> {
        self.cutoffs.as_ref().ok_or(ConfigError::Missing("cutoffs"))
    }
}

impl Cutoffs {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ssh_seconds == 0 {
            return Err(ConfigError::Invalid("cutoffs.\"ssh seconds\" must be positive".to_string()));
        }
        for (key, value) in [("sample hours", self.sample_hours), ("uptime days", self.uptime_days)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "cutoffs.\"{}\" must be a non-negative number, got {}",
                    key, value
                )));
            }
        }
        if resample_delta(self.sample_hours).is_none() {
            return Err(ConfigError::Invalid(format!(
                "cutoffs.\"sample hours\" is out of range, got {}",
                self.sample_hours
            )));
        }
        Ok(())
    }

    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_seconds)
    }

    /// Minimum age of a sample before the host is sampled again
    pub fn resample_after(&self) -> TimeDelta {
        resample_delta(self.sample_hours).unwrap_or(TimeDelta::MAX)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            uptime_days: self.uptime_days,
            update_days: self.update_days,
        }
    }
}

fn resample_delta(hours: f64) -> Option<TimeDelta> {
    // `as` saturates, and i64::MAX seconds is beyond TimeDelta's range
    TimeDelta::try_seconds((hours * 3600.0).round() as i64)
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Names::deserialize(deserializer)? {
        Names::One(name) => vec![name],
        Names::Many(names) => names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    const FULL: &str = r#"
ansible:
  config: /etc/ansible/ansible.cfg
  inventory:
    - production
    - virtual_running
data: /var/lib/update-tracker/hosts.db
cutoffs:
  ssh seconds: 10
  sample hours: 20
  uptime days: 30
  update days: 14
"#;

    #[test]
    fn full_config() {
        let file = write(FULL);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.data, PathBuf::from("/var/lib/update-tracker/hosts.db"));
        let ansible = config.ansible().unwrap();
        assert_eq!(ansible.config, PathBuf::from("/etc/ansible/ansible.cfg"));
        assert_eq!(ansible.inventory, vec!["production", "virtual_running"]);

        let cutoffs = config.cutoffs().unwrap();
        assert_eq!(cutoffs.ssh_timeout(), Duration::from_secs(10));
        assert_eq!(cutoffs.resample_after(), TimeDelta::hours(20));
        assert_eq!(
            cutoffs.thresholds(),
            Thresholds {
                uptime_days: 30.0,
                update_days: 14
            }
        );
    }

    #[test]
    fn single_inventory_name() {
        let file = write("ansible:\n  config: a.cfg\n  inventory: production\ndata: x.db\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ansible().unwrap().inventory, vec!["production"]);
        assert!(matches!(config.cutoffs(), Err(ConfigError::Missing("cutoffs"))));
    }

    #[test]
    fn data_only_is_enough_for_manage() {
        let file = write("data: hosts.db\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.data, PathBuf::from("hosts.db"));
        assert!(matches!(config.ansible(), Err(ConfigError::Missing("ansible"))));
    }

    #[test]
    fn missing_keys_are_errors() {
        let file = write("cutoffs:\n  ssh seconds: 10\n");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));

        let file = write("data: x.db\ncutoffs:\n  ssh seconds: 10\n  sample hours: 1\n  uptime days: 3\n");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn invalid_values_are_errors() {
        let file = write(
            "data: x.db\ncutoffs:\n  ssh seconds: 0\n  sample hours: 1\n  uptime days: 3\n  update days: 1\n",
        );
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));

        let file = write(
            "data: x.db\ncutoffs:\n  ssh seconds: 5\n  sample hours: -1\n  uptime days: 3\n  update days: 1\n",
        );
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn huge_sample_hours_are_rejected() {
        let file = write(
            "data: x.db\ncutoffs:\n  ssh seconds: 5\n  sample hours: 10000000000000\n  uptime days: 3\n  update days: 1\n",
        );
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("sample hours")));

        let cutoffs = Cutoffs {
            ssh_seconds: 5,
            sample_hours: 1e300,
            uptime_days: 3.0,
            update_days: 1,
        };
        assert_eq!(cutoffs.resample_after(), TimeDelta::MAX);
    }

    #[test]
    fn unreadable_file() {
        let err = Config::load(Path::new("/nonexistent/update-tracker.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
