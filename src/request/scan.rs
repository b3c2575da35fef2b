//! Request document discovery (pure, read-only).

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

/// File name suffix marking a request document.
///
/// Any suffix match counts, so `mod-redirects.json` can be added next to
/// `redirects.json` to extend a project's declarations.
pub const REQUEST_SUFFIX: &str = "redirects.json";

/// Find every request document under `root`, sorted by path.
///
/// Sorting keeps owner-group and declaration order stable between runs.
pub fn find_request_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(REQUEST_SUFFIX))
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}
