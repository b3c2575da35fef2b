//! Filesystem path resolution.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first; paths that do not exist yet (the output
/// directory on a first run) are made absolute against the current directory.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Expand `~` and resolve a configured path against the project root.
///
/// ```text
/// expand_path("docs", "/site")          -> /site/docs
/// expand_path("~/keys/state", "/site")  -> /home/me/keys/state
/// expand_path("/srv/out", "/site")      -> /srv/out
/// ```
pub fn expand_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

/// Resolve a user-supplied path that may be relative to cwd or to a fallback directory.
///
/// Tries in order: absolute as-is, existing relative to cwd, then `fallback_dir`.
/// `redirkit inspect state.json` therefore finds the file in the output directory.
#[inline]
pub fn resolve_path(path: &Path, fallback_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    if path.exists() {
        return normalize_path(path);
    }
    normalize_path(&fallback_dir.join(path))
}
