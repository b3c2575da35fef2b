//! Path utilities.
//!
//! - [`fs`]: Filesystem path normalization (`expand_path`, `normalize_path`, `resolve_path`)
//! - [`is_safe_relative`]: guard for addresses recovered from untrusted state

pub mod fs;

pub use fs::{expand_path, resolve_path};

use std::path::{Component, Path};

/// Check that `path` is relative and stays below the directory it is joined to.
///
/// Rejects absolute paths, `..`, and empty paths.
pub fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
