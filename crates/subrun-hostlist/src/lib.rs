//! Hostlist expressions and hostfiles.
//!
//! Node lists are passed around in a compact bracketed form such as
//! `node[001-004,7],gpu01`. This crate expands those expressions,
//! recompresses expanded lists back into ranged form, and reads
//! hostfiles (one expression per line).

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use thiserror::Error;

/// Cap on the number of hosts a single expression may generate.
pub const MAX_HOSTS: usize = 64 * 1024;

static NUM_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)(\d+)$").expect("valid regex"));

#[derive(Error, Debug)]
pub enum HostlistError {
    #[error("bad hostlist expression \"{0}\"")]
    Syntax(String),
    #[error("reversed range {0}-{1} in hostlist expression")]
    ReversedRange(u64, u64),
    #[error("hostlist expansion exceeds {MAX_HOSTS} hosts")]
    TooLarge,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An ordered list of host names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hostlist {
    hosts: Vec<String>,
}

impl Hostlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-expanded list of names.
    pub fn from_hosts(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    /// Expand a hostlist expression.
    ///
    /// Comma-separated at the top level; each element is either a
    /// plain name or `prefix[ranges]suffix` with comma-separated
    /// `a` / `a-b` ranges. Zero padding in a range start is preserved
    /// in the generated names.
    pub fn parse(expr: &str) -> Result<Self, HostlistError> {
        let mut list = Self::new();
        list.push(expr)?;
        Ok(list)
    }

    /// Expand an expression and append the hosts to this list.
    pub fn push(&mut self, expr: &str) -> Result<(), HostlistError> {
        for element in split_outside_brackets(expr)? {
            expand_element(element, &mut self.hosts)?;
            if self.hosts.len() > MAX_HOSTS {
                return Err(HostlistError::TooLarge);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn first(&self) -> Option<&str> {
        self.hosts.first().map(String::as_str)
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }

    /// Drop duplicate names, keeping the first occurrence of each.
    pub fn uniq(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.hosts.retain(|h| seen.insert(h.clone()));
    }

    /// Recompress into ranged form: consecutive runs of
    /// numerically-suffixed names collapse to `prefix[a-b,...]`.
    pub fn ranged_string(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut group: Option<Group> = None;

        for host in &self.hosts {
            match NUM_SUFFIX.captures(host) {
                Some(caps) => {
                    let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                    let token = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                    let value: u64 = match token.parse() {
                        Ok(v) => v,
                        // suffix too long for u64, treat as opaque
                        Err(_) => {
                            flush(&mut group, &mut out);
                            out.push(host.clone());
                            continue;
                        }
                    };
                    let same_prefix = group.as_ref().is_some_and(|g| g.prefix == prefix);
                    if same_prefix {
                        if let Some(g) = group.as_mut() {
                            g.add(token, value);
                        }
                    } else {
                        flush(&mut group, &mut out);
                        group = Some(Group::start(prefix, token, value));
                    }
                }
                None => {
                    flush(&mut group, &mut out);
                    out.push(host.clone());
                }
            }
        }
        flush(&mut group, &mut out);
        out.join(",")
    }
}

/// A run of same-prefix hosts being recompressed.
struct Group {
    prefix: String,
    // (start_token, end_token, end_value) per range
    ranges: Vec<(String, String, u64)>,
}

impl Group {
    fn start(prefix: &str, token: &str, value: u64) -> Self {
        Self {
            prefix: prefix.to_string(),
            ranges: vec![(token.to_string(), token.to_string(), value)],
        }
    }

    fn add(&mut self, token: &str, value: u64) {
        if let Some(last) = self.ranges.last_mut() {
            if value == last.2 + 1 && token.len() >= last.1.len() {
                last.1 = token.to_string();
                last.2 = value;
                return;
            }
        }
        self.ranges
            .push((token.to_string(), token.to_string(), value));
    }

    fn render(&self) -> String {
        if self.ranges.len() == 1 && self.ranges[0].0 == self.ranges[0].1 {
            return format!("{}{}", self.prefix, self.ranges[0].0);
        }
        let ranges: Vec<String> = self
            .ranges
            .iter()
            .map(|(a, b, _)| {
                if a == b {
                    a.clone()
                } else {
                    format!("{}-{}", a, b)
                }
            })
            .collect();
        format!("{}[{}]", self.prefix, ranges.join(","))
    }
}

fn flush(group: &mut Option<Group>, out: &mut Vec<String>) {
    if let Some(g) = group.take() {
        out.push(g.render());
    }
}

/// Split an expression on commas that are not inside brackets.
fn split_outside_brackets(expr: &str) -> Result<Vec<&str>, HostlistError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in expr.char_indices() {
        match c {
            '[' => {
                depth += 1;
                if depth > 1 {
                    return Err(HostlistError::Syntax(expr.to_string()));
                }
            }
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| HostlistError::Syntax(expr.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(HostlistError::Syntax(expr.to_string()));
    }
    parts.push(&expr[start..]);
    Ok(parts)
}

/// Expand one top-level element (`name` or `prefix[ranges]suffix`).
fn expand_element(element: &str, out: &mut Vec<String>) -> Result<(), HostlistError> {
    let element = element.trim();
    let syntax = || HostlistError::Syntax(element.to_string());
    if element.is_empty() {
        return Err(syntax());
    }

    let Some(open) = element.find('[') else {
        if element.contains(']') {
            return Err(syntax());
        }
        out.push(element.to_string());
        return Ok(());
    };
    let close = element.find(']').ok_or_else(syntax)?;
    if close < open {
        return Err(syntax());
    }
    let prefix = &element[..open];
    let ranges = &element[open + 1..close];
    let suffix = &element[close + 1..];
    if suffix.contains('[') || ranges.is_empty() {
        return Err(syntax());
    }

    for range in ranges.split(',') {
        let (lo_token, hi_token) = match range.split_once('-') {
            Some((lo, hi)) => (lo, hi),
            None => (range, range),
        };
        if !is_number(lo_token) || !is_number(hi_token) {
            return Err(syntax());
        }
        let lo: u64 = lo_token.parse().map_err(|_| syntax())?;
        let hi: u64 = hi_token.parse().map_err(|_| syntax())?;
        if hi < lo {
            return Err(HostlistError::ReversedRange(lo, hi));
        }
        if (hi - lo) as usize >= MAX_HOSTS {
            return Err(HostlistError::TooLarge);
        }
        let width = if lo_token.starts_with('0') && lo_token.len() > 1 {
            lo_token.len()
        } else {
            0
        };
        for n in lo..=hi {
            out.push(format!("{}{:0width$}{}", prefix, n, suffix));
        }
    }
    Ok(())
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.len() <= 18 && s.chars().all(|c| c.is_ascii_digit())
}

/// Read a hostfile: one hostlist expression per line, `#` comments
/// and blank lines skipped.
pub fn read_hostfile(path: &Utf8Path) -> Result<Hostlist, HostlistError> {
    let content = fs::read_to_string(path)?;
    let mut list = Hostlist::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        list.push(line)?;
    }
    Ok(list)
}
