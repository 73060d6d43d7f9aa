//! Purpose: Shared local screens-directory and screen-key path resolution.
//! Exports: `default_screens_dir` and `resolve_screen_path`.
//! Role: Keep CLI and store path semantics aligned from one source.
//! Invariants: Default screens directory remains `~/.screenbrew/screens`.
//! Invariants: Screen keys must be non-empty and free of path separators.

use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ScreenKeyError {
    Empty,
    ContainsPathSeparator,
}

pub(crate) fn default_screens_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".screenbrew").join("screens")
}

pub(crate) fn resolve_screen_path(key: &str, screens_dir: &Path) -> Result<PathBuf, ScreenKeyError> {
    if key.is_empty() {
        return Err(ScreenKeyError::Empty);
    }
    if key.contains('/') || key.contains('\\') {
        return Err(ScreenKeyError::ContainsPathSeparator);
    }
    if key.ends_with(".json") {
        return Ok(screens_dir.join(key));
    }
    Ok(screens_dir.join(format!("{key}.json")))
}
