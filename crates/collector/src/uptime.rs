//! Parsing of `uptime` command output

use crate::{CollectorError, Result};
use chrono::TimeDelta;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const MINUTES_PER_DAY: f64 = 1440.0;

// The phrase between "up" and the user count or load average.
static UP_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"up\s+(.+?)(?:,\s+\d+\s+users?|,\s+load)").unwrap());
static DAYS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+days?").unwrap());
static HOURS_MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+):(\d+)").unwrap());
static MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+min").unwrap());

/// Time since last boot, as reported by `uptime`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uptime {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl Uptime {
    /// Elapsed time in fractional days
    pub fn as_fractional_days(&self) -> f64 {
        self.days as f64 + self.hours as f64 / 24.0 + self.minutes as f64 / MINUTES_PER_DAY
    }

    /// Rebuild a normalized uptime from fractional days, rounded to the minute
    pub fn from_fractional_days(days: f64) -> Self {
        let total = (days.max(0.0) * MINUTES_PER_DAY).round() as u64;
        Self {
            days: (total / 1440) as u32,
            hours: (total % 1440 / 60) as u32,
            minutes: (total % 60) as u32,
        }
    }

    pub fn to_time_delta(&self) -> TimeDelta {
        TimeDelta::days(self.days as i64)
            + TimeDelta::hours(self.hours as i64)
            + TimeDelta::minutes(self.minutes as i64)
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days {
            0 => {}
            1 => write!(f, "1 day, ")?,
            n => write!(f, "{} days, ", n)?,
        }
        write!(f, "{}:{:02}", self.hours, self.minutes)
    }
}

/// Parse the output of `uptime`
///
/// Accepts lines such as
/// `16:07:47 up 4 days, 22:42,  9 users,  load average: 0.59, 0.84, 0.62`
/// or `up 42 min,  1 user,  load average: 0.00, 0.01, 0.05`.
pub fn parse_uptime(text: &str) -> Result<Uptime> {
    let phrase = UP_PHRASE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| CollectorError::Parse(format!("could not parse uptime from: {}", text.trim())))?;

    let mut uptime = Uptime::default();

    if let Some(c) = DAYS.captures(phrase) {
        uptime.days = number(&c[1], phrase)?;
    }

    if let Some(c) = HOURS_MINUTES.captures(phrase) {
        uptime.hours = number(&c[1], phrase)?;
        uptime.minutes = number(&c[2], phrase)?;
    } else if let Some(c) = MINUTES.captures(phrase) {
        uptime.minutes = number(&c[1], phrase)?;
    }

    Ok(uptime)
}

fn number(digits: &str, phrase: &str) -> Result<u32> {
    digits
        .parse()
        .map_err(|_| CollectorError::Parse(format!("number out of range in uptime: {}", phrase)))
}
