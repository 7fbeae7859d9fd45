//! Parsing of apt history logs

use chrono::NaiveDate;

const START_DATE: &str = "Start-Date:";
const TOOL: &str = "apt-get";
const ACTION: &str = "upgrade";

/// Dates of every upgrade transaction in an apt history log
///
/// A transaction qualifies when its `Start-Date:` line is directly followed by
/// a line naming both `apt-get` and `upgrade`, e.g.
///
/// ```text
/// Start-Date: 2024-01-25  10:30:15
/// Commandline: apt-get -y upgrade
/// ```
///
/// Start dates that are not `YYYY-MM-DD` calendar dates are skipped.
pub fn upgrade_dates(log: &str) -> impl Iterator<Item = NaiveDate> + '_ {
    let lines: Vec<&str> = log.lines().collect();

    (0..lines.len().saturating_sub(1)).filter_map(move |i| {
        let date = start_date(lines[i])?;
        let next = lines[i + 1];
        (next.contains(TOOL) && next.contains(ACTION)).then_some(date)
    })
}

/// Most recent upgrade date in the log, `None` if there is no upgrade
pub fn last_upgrade(log: &str) -> Option<NaiveDate> {
    upgrade_dates(log).max()
}

fn start_date(line: &str) -> Option<NaiveDate> {
    let value = line.strip_prefix(START_DATE)?.trim_start();
    let date = value.split_whitespace().next()?;

    // parse_from_str alone would accept unpadded fields such as 2024-1-5
    let shaped = date.len() == 10
        && date
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
