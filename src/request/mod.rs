//! Redirect request loading.
//!
//! | Module     | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `scan`     | Discover `*redirects.json` documents            |
//! | `document` | Parse one document into typed requests          |
//! | `kind`     | `Link`/`Image` kinds and extension detection    |
//!
//! Loading never fails as a whole: rejected documents and entries are
//! collected in a [`LoadReport`] and logged as warnings.

mod document;
mod kind;
mod scan;

pub use document::{EntryError, LoadError, RequestDocument};
pub use kind::RedirectKind;
pub use scan::find_request_files;

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::log;

/// One declared intent to redirect. Immutable after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRequest {
    /// URL to forward to, or image to mirror.
    pub source_url: String,
    pub kind: RedirectKind,
    /// Owner group that declared this request.
    pub owner: String,
}

/// All requests of one owner group, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestGroup {
    pub owner: String,
    pub requests: Vec<RedirectRequest>,
}

/// Lazily loads request documents found under a data directory.
#[derive(Debug, Clone)]
pub struct RequestLoader {
    files: Vec<PathBuf>,
}

impl RequestLoader {
    /// Discover request documents under `root`.
    pub fn scan(root: &Path) -> Self {
        Self {
            files: find_request_files(root),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Parse documents one at a time, in path order.
    pub fn documents(&self) -> impl Iterator<Item = Result<RequestDocument, LoadError>> + '_ {
        self.files.iter().map(|path| RequestDocument::load(path))
    }

    /// Load every document and merge them into owner groups.
    pub fn load(&self) -> LoadReport {
        LoadReport::collect(self.documents())
    }
}

/// Outcome of loading all request documents.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Owner groups in first-seen order.
    pub groups: Vec<RequestGroup>,
    /// Documents skipped entirely.
    pub rejected_documents: Vec<LoadError>,
    /// Entries skipped inside accepted documents.
    pub rejected_entries: Vec<(PathBuf, EntryError)>,
}

impl LoadReport {
    /// Merge parsed documents into owner groups.
    ///
    /// Documents sharing an owner group are appended in order. A source URL
    /// declared twice for the same group is skipped: one identity must map to
    /// exactly one published address.
    pub fn collect(documents: impl IntoIterator<Item = Result<RequestDocument, LoadError>>) -> Self {
        let mut report = Self::default();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut seen: FxHashSet<(String, String)> = FxHashSet::default();

        for document in documents {
            let document = match document {
                Ok(document) => document,
                Err(err) => {
                    report.rejected_documents.push(err);
                    continue;
                }
            };

            let RequestDocument {
                path,
                owner,
                requests,
                rejected,
            } = document;
            report
                .rejected_entries
                .extend(rejected.into_iter().map(|err| (path.clone(), err)));

            let slot = *index.entry(owner.clone()).or_insert_with(|| {
                report.groups.push(RequestGroup {
                    owner: owner.clone(),
                    requests: Vec::new(),
                });
                report.groups.len() - 1
            });

            for request in requests {
                if !seen.insert((owner.clone(), request.source_url.clone())) {
                    report.rejected_entries.push((
                        path.clone(),
                        EntryError::Duplicate {
                            owner: owner.clone(),
                            url: request.source_url,
                        },
                    ));
                    continue;
                }
                report.groups[slot].requests.push(request);
            }
        }

        // A document whose entries were all skipped contributes nothing
        report.groups.retain(|group| !group.requests.is_empty());
        report
    }

    /// Total number of valid requests across all groups.
    pub fn request_count(&self) -> usize {
        self.groups.iter().map(|g| g.requests.len()).sum()
    }

    pub fn has_rejections(&self) -> bool {
        !self.rejected_documents.is_empty() || !self.rejected_entries.is_empty()
    }

    /// Log every rejected document and entry as a warning.
    pub fn log_warnings(&self) {
        for err in &self.rejected_documents {
            log!("warn"; "skipping document: {}", err);
        }
        for (path, err) in &self.rejected_entries {
            log!("warn"; "skipping entry in {}: {}", path.display(), err);
        }
    }
}
