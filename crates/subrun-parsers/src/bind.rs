//! CPU and memory binding spec parsing.
//!
//! A bind spec is a comma-separated list of control tokens
//! (`quiet`/`verbose`) followed by at most one binding mode. The
//! `map_*:`/`mask_*:` modes consume the remainder of the spec as their
//! id list, so `v,map_cpu:0,1,2` keeps `0,1,2` intact.

use crate::ParseError;
use serde::{Deserialize, Serialize};

/// CPU binding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuBindMode {
    None,
    Rank,
    MapCpu,
    MaskCpu,
    Sockets,
    Cores,
    Threads,
}

impl CpuBindMode {
    /// Token form used in `SLURM_CPU_BIND_TYPE`. Map and mask carry a
    /// trailing colon so the list can be appended directly.
    pub fn as_type_str(&self) -> &'static str {
        match self {
            CpuBindMode::None => "none",
            CpuBindMode::Rank => "rank",
            CpuBindMode::MapCpu => "map_cpu:",
            CpuBindMode::MaskCpu => "mask_cpu:",
            CpuBindMode::Sockets => "sockets",
            CpuBindMode::Cores => "cores",
            CpuBindMode::Threads => "threads",
        }
    }
}

/// Parsed `--cpu-bind` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuBind {
    /// Binding mode, if one was named. A spec of just `v` sets only
    /// the verbosity.
    pub mode: Option<CpuBindMode>,
    /// Raw id list for the map/mask modes, kept verbatim.
    pub list: Option<String>,
    pub verbose: bool,
}

impl CpuBind {
    pub fn type_str(&self) -> &'static str {
        self.mode.map(|m| m.as_type_str()).unwrap_or("")
    }

    pub fn list_str(&self) -> &str {
        self.list.as_deref().unwrap_or("")
    }

    /// Canonical form exported as `SLURM_CPU_BIND`.
    pub fn to_env_string(&self) -> String {
        let verbose = if self.verbose { "verbose" } else { "quiet" };
        match self.mode {
            Some(mode) => format!("{},{}{}", verbose, mode.as_type_str(), self.list_str()),
            None => verbose.to_string(),
        }
    }
}

/// Memory binding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemBindMode {
    None,
    Rank,
    Local,
    MapMem,
    MaskMem,
}

impl MemBindMode {
    pub fn as_type_str(&self) -> &'static str {
        match self {
            MemBindMode::None => "none",
            MemBindMode::Rank => "rank",
            MemBindMode::Local => "local",
            MemBindMode::MapMem => "map_mem:",
            MemBindMode::MaskMem => "mask_mem:",
        }
    }
}

/// Parsed `--mem-bind` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemBind {
    pub mode: Option<MemBindMode>,
    pub list: Option<String>,
    pub verbose: bool,
}

impl MemBind {
    pub fn type_str(&self) -> &'static str {
        self.mode.map(|m| m.as_type_str()).unwrap_or("")
    }

    pub fn list_str(&self) -> &str {
        self.list.as_deref().unwrap_or("")
    }

    /// Canonical form exported as `SLURM_MEM_BIND`.
    pub fn to_env_string(&self) -> String {
        let verbose = if self.verbose { "verbose" } else { "quiet" };
        match self.mode {
            Some(mode) => format!("{},{}{}", verbose, mode.as_type_str(), self.list_str()),
            None => verbose.to_string(),
        }
    }
}

/// Parse a `--cpu-bind` spec.
pub fn parse_cpu_bind(s: &str) -> Result<CpuBind, ParseError> {
    let err = || ParseError::new("cpu bind", s);
    let mut bind = CpuBind {
        mode: None,
        list: None,
        verbose: false,
    };

    let mut rest = s.trim();
    if rest.is_empty() {
        return Err(err());
    }
    while !rest.is_empty() {
        if let Some(list) = strip_list_prefix(rest, "map_cpu:") {
            validate_id_list(list, false).ok_or_else(err)?;
            bind.mode = Some(CpuBindMode::MapCpu);
            bind.list = Some(list.to_string());
            break;
        }
        if let Some(list) = strip_list_prefix(rest, "mask_cpu:") {
            validate_id_list(list, true).ok_or_else(err)?;
            bind.mode = Some(CpuBindMode::MaskCpu);
            bind.list = Some(list.to_string());
            break;
        }

        let (token, remainder) = match rest.split_once(',') {
            Some((t, r)) => (t, r),
            None => (rest, ""),
        };
        match token.to_ascii_lowercase().as_str() {
            "q" | "quiet" => bind.verbose = false,
            "v" | "verbose" => bind.verbose = true,
            "no" | "none" => bind.mode = Some(CpuBindMode::None),
            "rank" => bind.mode = Some(CpuBindMode::Rank),
            "sockets" => bind.mode = Some(CpuBindMode::Sockets),
            "cores" => bind.mode = Some(CpuBindMode::Cores),
            "threads" => bind.mode = Some(CpuBindMode::Threads),
            _ => return Err(err()),
        }
        rest = remainder;
    }
    Ok(bind)
}

/// Parse a `--mem-bind` spec.
pub fn parse_mem_bind(s: &str) -> Result<MemBind, ParseError> {
    let err = || ParseError::new("mem bind", s);
    let mut bind = MemBind {
        mode: None,
        list: None,
        verbose: false,
    };

    let mut rest = s.trim();
    if rest.is_empty() {
        return Err(err());
    }
    while !rest.is_empty() {
        if let Some(list) = strip_list_prefix(rest, "map_mem:") {
            validate_id_list(list, false).ok_or_else(err)?;
            bind.mode = Some(MemBindMode::MapMem);
            bind.list = Some(list.to_string());
            break;
        }
        if let Some(list) = strip_list_prefix(rest, "mask_mem:") {
            validate_id_list(list, true).ok_or_else(err)?;
            bind.mode = Some(MemBindMode::MaskMem);
            bind.list = Some(list.to_string());
            break;
        }

        let (token, remainder) = match rest.split_once(',') {
            Some((t, r)) => (t, r),
            None => (rest, ""),
        };
        match token.to_ascii_lowercase().as_str() {
            "q" | "quiet" => bind.verbose = false,
            "v" | "verbose" => bind.verbose = true,
            "no" | "none" => bind.mode = Some(MemBindMode::None),
            "rank" => bind.mode = Some(MemBindMode::Rank),
            "local" => bind.mode = Some(MemBindMode::Local),
            _ => return Err(err()),
        }
        rest = remainder;
    }
    Ok(bind)
}

/// Case-insensitive prefix strip for the list-bearing modes.
fn strip_list_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Check a map/mask id list. Map entries are decimal or `0x` hex;
/// mask entries are hex with the `0x` optional. Returns `None` on an
/// empty list or bad entry.
fn validate_id_list(list: &str, mask: bool) -> Option<()> {
    if list.is_empty() {
        return None;
    }
    for entry in list.split(',') {
        let hex = entry.strip_prefix("0x").or_else(|| entry.strip_prefix("0X"));
        let ok = match (hex, mask) {
            (Some(h), _) => !h.is_empty() && h.chars().all(|c| c.is_ascii_hexdigit()),
            (None, true) => !entry.is_empty() && entry.chars().all(|c| c.is_ascii_hexdigit()),
            (None, false) => !entry.is_empty() && entry.chars().all(|c| c.is_ascii_digit()),
        };
        if !ok {
            return None;
        }
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_bind_simple_modes() {
        let bind = parse_cpu_bind("rank").unwrap();
        assert_eq!(bind.mode, Some(CpuBindMode::Rank));
        assert!(!bind.verbose);

        let bind = parse_cpu_bind("threads").unwrap();
        assert_eq!(bind.mode, Some(CpuBindMode::Threads));

        let bind = parse_cpu_bind("none").unwrap();
        assert_eq!(bind.mode, Some(CpuBindMode::None));
    }

    #[test]
    fn test_cpu_bind_verbose_and_quiet() {
        let bind = parse_cpu_bind("v,rank").unwrap();
        assert!(bind.verbose);
        assert_eq!(bind.mode, Some(CpuBindMode::Rank));

        // verbose alone is a valid spec
        let bind = parse_cpu_bind("verbose").unwrap();
        assert!(bind.verbose);
        assert_eq!(bind.mode, None);

        // a later quiet wins over an earlier verbose
        let bind = parse_cpu_bind("v,q,rank").unwrap();
        assert!(!bind.verbose);
    }

    #[test]
    fn test_cpu_bind_map_keeps_commas() {
        let bind = parse_cpu_bind("v,map_cpu:0,2,4").unwrap();
        assert!(bind.verbose);
        assert_eq!(bind.mode, Some(CpuBindMode::MapCpu));
        assert_eq!(bind.list.as_deref(), Some("0,2,4"));
        assert_eq!(bind.to_env_string(), "verbose,map_cpu:0,2,4");
    }

    #[test]
    fn test_cpu_bind_mask() {
        let bind = parse_cpu_bind("mask_cpu:0x3,0xC").unwrap();
        assert_eq!(bind.mode, Some(CpuBindMode::MaskCpu));
        assert_eq!(bind.list.as_deref(), Some("0x3,0xC"));

        assert!(parse_cpu_bind("mask_cpu:zz").is_err());
        assert!(parse_cpu_bind("mask_cpu:").is_err());
        assert!(parse_cpu_bind("map_cpu:0x").is_err());
    }

    #[test]
    fn test_cpu_bind_rejects() {
        assert!(parse_cpu_bind("").is_err());
        assert!(parse_cpu_bind("sideways").is_err());
        assert!(parse_cpu_bind("rank,sideways").is_err());
    }

    #[test]
    fn test_cpu_bind_env_string() {
        assert_eq!(parse_cpu_bind("rank").unwrap().to_env_string(), "quiet,rank");
        assert_eq!(parse_cpu_bind("v").unwrap().to_env_string(), "verbose");
    }

    #[test]
    fn test_mem_bind() {
        let bind = parse_mem_bind("local").unwrap();
        assert_eq!(bind.mode, Some(MemBindMode::Local));

        let bind = parse_mem_bind("v,map_mem:0,1").unwrap();
        assert!(bind.verbose);
        assert_eq!(bind.mode, Some(MemBindMode::MapMem));
        assert_eq!(bind.list.as_deref(), Some("0,1"));

        assert!(parse_mem_bind("sockets").is_err());
    }
}
