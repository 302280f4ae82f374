//! Time-limit and begin-time parsing.

use crate::ParseError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A job time limit in whole minutes, or unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeLimit {
    Unlimited,
    Minutes(u32),
}

impl TimeLimit {
    /// The limit in minutes, or `None` when unlimited.
    pub fn as_minutes(&self) -> Option<u32> {
        match self {
            TimeLimit::Unlimited => None,
            TimeLimit::Minutes(m) => Some(*m),
        }
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLimit::Unlimited => write!(f, "UNLIMITED"),
            TimeLimit::Minutes(m) => {
                let days = m / (24 * 60);
                let hours = (m % (24 * 60)) / 60;
                let mins = m % 60;
                if days > 0 {
                    write!(f, "{}-{:02}:{:02}:00", days, hours, mins)
                } else {
                    write!(f, "{:02}:{:02}:00", hours, mins)
                }
            }
        }
    }
}

/// Parse a time limit string.
///
/// Accepts `<minutes>`, `<min>:<sec>`, `<hh>:<mm>:<ss>`,
/// `<days>-<hh>[:<mm>[:<ss>]]`, and `-1`/`unlimited`/`infinite`.
/// Partial minutes round up.
pub fn parse_time_limit(s: &str) -> Result<TimeLimit, ParseError> {
    let err = || ParseError::new("time limit", s);
    let trimmed = s.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "-1" | "unlimited" | "infinite" => return Ok(TimeLimit::Unlimited),
        "" => return Err(err()),
        _ => {}
    }

    let (days, time_part) = match trimmed.split_once('-') {
        Some((d, rest)) => (Some(d.parse::<u64>().map_err(|_| err())?), rest),
        None => (None, trimmed),
    };

    let parts: Vec<u64> = time_part
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|_| err()))
        .collect::<Result<_, _>>()?;

    // With a day field the first component is hours; without one a
    // single component means minutes and two mean minutes:seconds.
    let seconds = match (days, parts.as_slice()) {
        (Some(_), [h]) => h * 3600,
        (Some(_), [h, m]) => h * 3600 + m * 60,
        (_, [h, m, s]) => h * 3600 + m * 60 + s,
        (None, [m]) => m * 60,
        (None, [m, s]) => m * 60 + s,
        _ => return Err(err()),
    };

    let total = days.unwrap_or(0) * 86400 + seconds;
    let minutes = total.div_ceil(60);
    u32::try_from(minutes)
        .map(TimeLimit::Minutes)
        .map_err(|_| err())
}

/// Parse a `--begin` time specification relative to `now`.
///
/// Accepts `now`, `now+<n>[seconds|minutes|hours|days]`, the keywords
/// `midnight`, `noon` and `teatime`, clock times `HH:MM[:SS]` (rolled
/// to the next day when already past), and dates `YYYY-MM-DD`,
/// `YYYY-MM-DDTHH:MM[:SS]` and `MM/DD/YY`.
pub fn parse_begin_time(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ParseError> {
    let err = || ParseError::new("begin time", s);
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower == "now" {
        return Ok(now);
    }
    if let Some(offset) = lower.strip_prefix("now+") {
        return parse_now_offset(offset, now).ok_or_else(err);
    }

    let today = now.date();
    match lower.as_str() {
        "midnight" => {
            let tomorrow = today.succ_opt().ok_or_else(err)?;
            return Ok(tomorrow.and_hms_opt(0, 0, 0).ok_or_else(err)?);
        }
        "noon" => return Ok(roll_forward(today.and_hms_opt(12, 0, 0).ok_or_else(err)?, now)),
        "teatime" => return Ok(roll_forward(today.and_hms_opt(16, 0, 0).ok_or_else(err)?, now)),
        _ => {}
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0).ok_or_else(err);
        }
    }
    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, fmt) {
            return Ok(roll_forward(today.and_time(time), now));
        }
    }

    Err(err())
}

/// A clock time already past today means the same time tomorrow.
fn roll_forward(dt: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if dt <= now {
        dt + Duration::days(1)
    } else {
        dt
    }
}

fn parse_now_offset(spec: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let digits_end = spec
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(spec.len());
    let count: i64 = spec[..digits_end].parse().ok()?;
    let unit = spec[digits_end..].trim();

    let seconds = if unit.is_empty() || "seconds".starts_with(unit) {
        count
    } else if "minutes".starts_with(unit) {
        count * 60
    } else if "hours".starts_with(unit) {
        count * 3600
    } else if "days".starts_with(unit) {
        count * 86400
    } else {
        return None;
    };
    Some(now + Duration::seconds(seconds))
}
