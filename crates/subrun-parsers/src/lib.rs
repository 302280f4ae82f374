//! Shared parsing for job-submission option strings.
//!
//! Every option value that can arrive from more than one place (a
//! command-line flag, an environment variable, a hostfile entry) is
//! parsed here so the overlay passes share one grammar.

pub mod bind;
pub mod dist;
pub mod memory;
pub mod time;
pub mod topology;

use thiserror::Error;

pub use bind::{parse_cpu_bind, parse_mem_bind, CpuBind, CpuBindMode, MemBind, MemBindMode};
pub use dist::{parse_distribution, Distribution};
pub use memory::parse_size_mb;
pub use time::{parse_begin_time, parse_time_limit, TimeLimit};
pub use topology::{parse_conn_type, parse_geometry, ConnType};

/// Error type shared by all option-string parsers.
///
/// The `what` field names the option grammar that rejected the input
/// (e.g. "distribution", "memory size") so callers can surface the
/// message without further context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {what} \"{input}\"")]
pub struct ParseError {
    pub what: &'static str,
    pub input: String,
}

impl ParseError {
    pub fn new(what: &'static str, input: &str) -> Self {
        Self {
            what,
            input: input.to_string(),
        }
    }
}

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a yes/no flag value as used by environment variables.
///
/// Accepts `yes`/`no`, `true`/`false` and `1`/`0`, case-insensitive.
pub fn parse_bool(s: &str) -> Result<bool, ParseError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(ParseError::new("boolean", s)),
    }
}

/// Parse a node-count range of the form `min[-max]`.
///
/// Both endpoints must be positive and min must not exceed max.
pub fn parse_node_range(s: &str) -> Result<(u32, Option<u32>), ParseError> {
    let err = || ParseError::new("node count", s);
    let (min_str, max_str) = match s.split_once('-') {
        Some((min, max)) => (min, Some(max)),
        None => (s, None),
    };
    let min: u32 = min_str.trim().parse().map_err(|_| err())?;
    if min == 0 {
        return Err(err());
    }
    let max = match max_str {
        Some(m) => {
            let max: u32 = m.trim().parse().map_err(|_| err())?;
            if max < min {
                return Err(err());
            }
            Some(max)
        }
        None => None,
    };
    Ok((min, max))
}
