//! Multi-prog config files.
//!
//! A multi-prog file assigns different executables to different task
//! ids within one step:
//!
//! ```text
//! # task-ids  program  args
//! 0           master   --listen
//! 1-4,6       worker   --rank=%t
//! *           filler   %o
//! ```
//!
//! `%t` expands to the task id and `%o` to the task's offset within
//! its id spec. Expansion happens per task at spawn time.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use thiserror::Error;

use crate::path::search_path;

#[derive(Error, Debug)]
pub enum MultiProgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{file}:{line}: malformed multi-prog entry")]
    Syntax { file: Utf8PathBuf, line: usize },
    #[error("{file}:{line}: bad task id spec \"{spec}\"")]
    BadRanks {
        file: Utf8PathBuf,
        line: usize,
        spec: String,
    },
    #[error("task id {rank} is outside the step's {ntasks} tasks")]
    RankOutOfRange { rank: u32, ntasks: u32 },
    #[error("task id {0} is assigned more than once")]
    Overlap(u32),
    #[error("no program assigned to task id {0}")]
    Uncovered(u32),
    #[error("cannot resolve multi-prog executable \"{0}\"")]
    ProgNotFound(String),
}

/// Task ids an entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RankSpec {
    /// `*`: any task not claimed by an earlier entry.
    Wildcard,
    Ids(Vec<u32>),
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiProgEntry {
    pub ranks: RankSpec,
    pub program: String,
    pub args: Vec<String>,
}

/// A parsed multi-prog table.
#[derive(Debug, Clone, Serialize)]
pub struct MultiProg {
    pub path: Utf8PathBuf,
    entries: Vec<MultiProgEntry>,
}

impl MultiProg {
    /// Parse a multi-prog file. `#` comments and blank lines are
    /// skipped; each remaining line is `<taskids> <program> [args...]`.
    pub fn load(path: &Utf8Path) -> Result<Self, MultiProgError> {
        let content = fs::read_to_string(path)?;
        let mut entries = Vec::new();

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(spec), Some(program)) = (fields.next(), fields.next()) else {
                return Err(MultiProgError::Syntax {
                    file: path.to_path_buf(),
                    line: lineno + 1,
                });
            };
            let ranks = parse_rank_spec(spec).ok_or_else(|| MultiProgError::BadRanks {
                file: path.to_path_buf(),
                line: lineno + 1,
                spec: spec.to_string(),
            })?;
            entries.push(MultiProgEntry {
                ranks,
                program: program.to_string(),
                args: fields.map(str::to_string).collect(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Check coverage against the step's task count and resolve every
    /// program through the path search.
    pub fn validate(&mut self, ntasks: u32, cwd: &Utf8Path) -> Result<(), MultiProgError> {
        let mut claimed = vec![false; ntasks as usize];
        let mut wildcard = false;

        for entry in &self.entries {
            match &entry.ranks {
                RankSpec::Wildcard => wildcard = true,
                RankSpec::Ids(ids) => {
                    for &rank in ids {
                        if rank >= ntasks {
                            return Err(MultiProgError::RankOutOfRange { rank, ntasks });
                        }
                        if claimed[rank as usize] {
                            return Err(MultiProgError::Overlap(rank));
                        }
                        claimed[rank as usize] = true;
                    }
                }
            }
        }
        if !wildcard {
            if let Some(rank) = claimed.iter().position(|c| !c) {
                return Err(MultiProgError::Uncovered(rank as u32));
            }
        }

        for entry in &mut self.entries {
            let resolved = search_path(cwd, &entry.program, false)
                .ok_or_else(|| MultiProgError::ProgNotFound(entry.program.clone()))?;
            entry.program = resolved.into_string();
        }
        Ok(())
    }

    /// The argv for a task, with `%t` and `%o` expanded. Entries are
    /// matched in file order; a wildcard entry matches any task.
    pub fn command_for(&self, task: u32) -> Option<Vec<String>> {
        for entry in &self.entries {
            let offset = match &entry.ranks {
                RankSpec::Wildcard => task,
                RankSpec::Ids(ids) => {
                    match ids.iter().position(|&r| r == task) {
                        Some(offset) => offset as u32,
                        None => continue,
                    }
                }
            };
            let expand = |s: &str| {
                s.replace("%t", &task.to_string())
                    .replace("%o", &offset.to_string())
            };
            let mut argv = vec![expand(&entry.program)];
            argv.extend(entry.args.iter().map(|a| expand(a)));
            return Some(argv);
        }
        None
    }

    pub fn entries(&self) -> &[MultiProgEntry] {
        &self.entries
    }
}

/// `*`, or a comma list of ids and `a-b` ranges.
fn parse_rank_spec(spec: &str) -> Option<RankSpec> {
    if spec == "*" {
        return Some(RankSpec::Wildcard);
    }
    let mut ids = Vec::new();
    for part in spec.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.parse().ok()?;
                let hi: u32 = hi.parse().ok()?;
                if hi < lo {
                    return None;
                }
                ids.extend(lo..=hi);
            }
            None => ids.push(part.parse().ok()?),
        }
    }
    if ids.is_empty() {
        return None;
    }
    Some(RankSpec::Ids(ids))
}
