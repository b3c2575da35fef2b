//! Request document parsing.
//!
//! A request document is a JSON file declaring the redirects of one owner group:
//!
//! ```json
//! {
//!   "owner_group_id": "teamA",
//!   "redirects": [
//!     { "url": "https://x.test/banner.png" },
//!     { "url": "https://x.test/info", "type": "LINK" }
//!   ]
//! }
//! ```
//!
//! Document-level problems reject the whole file ([`LoadError`]); problems with a
//! single entry only skip that entry ([`EntryError`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{RedirectKind, RedirectRequest};

/// A rejected request document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid JSON in `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("missing owner group id in `{0}`")]
    MissingOwner(PathBuf),

    #[error("empty owner group id in `{0}`")]
    EmptyOwner(PathBuf),

    #[error("missing redirects in `{0}`")]
    MissingRedirects(PathBuf),

    #[error("no redirects in `{0}`")]
    EmptyRedirects(PathBuf),
}

/// A skipped entry inside an otherwise valid document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("entry #{index} is missing a url")]
    MissingUrl { index: usize },

    #[error("entry #{index} is not an object")]
    Malformed { index: usize },

    #[error("type `{kind}` is not a valid type for {url}")]
    UnknownKind { url: String, kind: String },

    #[error("{url} is declared more than once for `{owner}`")]
    Duplicate { owner: String, url: String },
}

/// Raw document shape; everything optional so each check can be reported.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(alias = "repo_name")]
    owner_group_id: Option<String>,
    redirects: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// A parsed request document.
#[derive(Debug, Clone)]
pub struct RequestDocument {
    /// File the document was read from.
    pub path: PathBuf,
    /// Owner group id as declared, surrounding whitespace trimmed.
    pub owner: String,
    /// Valid requests in declaration order.
    pub requests: Vec<RedirectRequest>,
    /// Entries that were skipped.
    pub rejected: Vec<EntryError>,
}

impl RequestDocument {
    /// Read and parse a request document from disk.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content =
            fs::read_to_string(path).map_err(|err| LoadError::Io(path.to_path_buf(), err))?;
        Self::parse(path, &content)
    }

    /// Parse a request document from its JSON text.
    pub fn parse(path: &Path, content: &str) -> Result<Self, LoadError> {
        let raw: RawDocument = serde_json::from_str(content)
            .map_err(|err| LoadError::Json(path.to_path_buf(), err))?;

        let owner = raw
            .owner_group_id
            .ok_or_else(|| LoadError::MissingOwner(path.to_path_buf()))?;
        let owner = owner.trim().to_string();
        if owner.is_empty() {
            return Err(LoadError::EmptyOwner(path.to_path_buf()));
        }

        let entries = raw
            .redirects
            .ok_or_else(|| LoadError::MissingRedirects(path.to_path_buf()))?;
        if entries.is_empty() {
            return Err(LoadError::EmptyRedirects(path.to_path_buf()));
        }

        let mut requests = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for (index, value) in entries.into_iter().enumerate() {
            match parse_entry(index, value, &owner) {
                Ok(request) => requests.push(request),
                Err(err) => rejected.push(err),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            owner,
            requests,
            rejected,
        })
    }
}

fn parse_entry(
    index: usize,
    value: serde_json::Value,
    owner: &str,
) -> Result<RedirectRequest, EntryError> {
    let entry: RawEntry =
        serde_json::from_value(value).map_err(|_| EntryError::Malformed { index })?;

    let url = entry
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(EntryError::MissingUrl { index })?;

    // Explicit type wins when present
    let kind = match entry.kind {
        Some(name) => RedirectKind::from_name(&name).ok_or_else(|| EntryError::UnknownKind {
            url: url.clone(),
            kind: name,
        })?,
        None => RedirectKind::auto_detect(&url),
    };

    Ok(RedirectRequest {
        source_url: url,
        kind,
        owner: owner.to_string(),
    })
}
