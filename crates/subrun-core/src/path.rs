//! Executable path search.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::os::unix::fs::PermissionsExt;

/// Resolve `cmd` to an absolute executable path.
///
/// A command containing a slash is resolved against `cwd` directly.
/// Otherwise each `$PATH` entry is tried in order; an empty or `.`
/// entry means `cwd`. With `cwd_first` the working directory is tried
/// before `$PATH` (the historical behavior for relative launches).
pub fn search_path(cwd: &Utf8Path, cmd: &str, cwd_first: bool) -> Option<Utf8PathBuf> {
    if cmd.contains('/') {
        let full = fullpath(cmd, cwd);
        return is_executable(&full).then_some(full);
    }
    let path_var = std::env::var("PATH").unwrap_or_default();
    search_in(&path_var, cwd, cmd, cwd_first)
}

fn search_in(path_var: &str, cwd: &Utf8Path, cmd: &str, cwd_first: bool) -> Option<Utf8PathBuf> {
    let candidate = |dir: &Utf8Path| {
        let full = dir.join(cmd);
        is_executable(&full).then_some(full)
    };

    if cwd_first {
        if let Some(found) = candidate(cwd) {
            return Some(found);
        }
    }
    for dir in path_var.split(':') {
        let dir = if dir.is_empty() || dir == "." {
            cwd.to_path_buf()
        } else if dir.starts_with('/') {
            Utf8PathBuf::from(dir)
        } else {
            cwd.join(dir)
        };
        if let Some(found) = candidate(&dir) {
            return Some(found);
        }
    }
    None
}

/// Make a path absolute relative to `cwd`.
pub fn fullpath(cmd: &str, cwd: &Utf8Path) -> Utf8PathBuf {
    if cmd.starts_with('/') {
        Utf8PathBuf::from(cmd)
    } else {
        cwd.join(cmd)
    }
}

fn is_executable(path: &Utf8Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
