//! Task distribution parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy for laying out tasks over the allocated nodes.
///
/// The two-level variants give the node-level policy first and the
/// within-node (socket) policy second, matching the `block:cyclic`
/// spelling of the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    Block,
    Cyclic,
    /// Tasks placed exactly as listed in a hostfile/nodelist.
    Arbitrary,
    /// Blocks of `plane_size` tasks placed round-robin.
    Plane,
    BlockBlock,
    BlockCyclic,
    CyclicBlock,
    CyclicCyclic,
}

impl Distribution {
    /// The canonical lowercase form exported to the environment.
    pub fn as_env_str(&self) -> &'static str {
        match self {
            Distribution::Block => "block",
            Distribution::Cyclic => "cyclic",
            Distribution::Arbitrary => "arbitrary",
            Distribution::Plane => "plane",
            Distribution::BlockBlock => "block:block",
            Distribution::BlockCyclic => "block:cyclic",
            Distribution::CyclicBlock => "cyclic:block",
            Distribution::CyclicCyclic => "cyclic:cyclic",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_str())
    }
}

/// Match a token as a unique prefix of one of `names`.
fn match_prefix(token: &str, names: &[&'static str]) -> Option<&'static str> {
    if token.is_empty() {
        return None;
    }
    let mut hits = names.iter().copied().filter(|n| n.starts_with(token));
    match (hits.next(), hits.next()) {
        (Some(name), None) => Some(name),
        _ => None,
    }
}

/// Parse a `--distribution` value.
///
/// Accepts `block`, `cyclic`, `arbitrary` (or `hostfile`), `plane`
/// and `plane=<size>`, and the two-level pairs `block:block`,
/// `block:cyclic`, `cyclic:block`, `cyclic:cyclic`. Tokens may be
/// abbreviated to any unique prefix. Returns the distribution and the
/// plane size when one was embedded in the value.
pub fn parse_distribution(s: &str) -> Result<(Distribution, Option<u32>), ParseError> {
    let err = || ParseError::new("distribution", s);
    let lower = s.trim().to_ascii_lowercase();

    if let Some(size) = lower.strip_prefix("plane=") {
        let size: u32 = size.parse().map_err(|_| err())?;
        if size == 0 {
            return Err(err());
        }
        return Ok((Distribution::Plane, Some(size)));
    }

    if let Some((first, second)) = lower.split_once(':') {
        let first = match_prefix(first, &["block", "cyclic"]).ok_or_else(err)?;
        let second = match_prefix(second, &["block", "cyclic"]).ok_or_else(err)?;
        let dist = match (first, second) {
            ("block", "block") => Distribution::BlockBlock,
            ("block", "cyclic") => Distribution::BlockCyclic,
            ("cyclic", "block") => Distribution::CyclicBlock,
            _ => Distribution::CyclicCyclic,
        };
        return Ok((dist, None));
    }

    let name =
        match_prefix(&lower, &["block", "cyclic", "arbitrary", "hostfile", "plane"]).ok_or_else(err)?;
    let dist = match name {
        "block" => Distribution::Block,
        "cyclic" => Distribution::Cyclic,
        "arbitrary" | "hostfile" => Distribution::Arbitrary,
        _ => Distribution::Plane,
    };
    Ok((dist, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_level() {
        assert_eq!(parse_distribution("block"), Ok((Distribution::Block, None)));
        assert_eq!(parse_distribution("CYCLIC"), Ok((Distribution::Cyclic, None)));
        assert_eq!(
            parse_distribution("arbitrary"),
            Ok((Distribution::Arbitrary, None))
        );
        assert_eq!(
            parse_distribution("hostfile"),
            Ok((Distribution::Arbitrary, None))
        );
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(parse_distribution("b"), Ok((Distribution::Block, None)));
        assert_eq!(parse_distribution("cyc"), Ok((Distribution::Cyclic, None)));
        assert_eq!(parse_distribution("a"), Ok((Distribution::Arbitrary, None)));
    }

    #[test]
    fn test_parse_plane() {
        assert_eq!(parse_distribution("plane"), Ok((Distribution::Plane, None)));
        assert_eq!(
            parse_distribution("plane=4"),
            Ok((Distribution::Plane, Some(4)))
        );
        assert!(parse_distribution("plane=0").is_err());
        assert!(parse_distribution("plane=x").is_err());
    }

    #[test]
    fn test_parse_two_level() {
        assert_eq!(
            parse_distribution("block:cyclic"),
            Ok((Distribution::BlockCyclic, None))
        );
        assert_eq!(
            parse_distribution("cyclic:cyclic"),
            Ok((Distribution::CyclicCyclic, None))
        );
        assert_eq!(
            parse_distribution("b:b"),
            Ok((Distribution::BlockBlock, None))
        );
        assert!(parse_distribution("plane:cyclic").is_err());
        assert!(parse_distribution("block:").is_err());
    }

    #[test]
    fn test_parse_rejects() {
        assert!(parse_distribution("").is_err());
        assert!(parse_distribution("banana").is_err());
    }

    #[test]
    fn test_env_str() {
        assert_eq!(Distribution::BlockCyclic.as_env_str(), "block:cyclic");
        assert_eq!(Distribution::Plane.to_string(), "plane");
    }
}
