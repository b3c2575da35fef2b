//! `[site]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [site]
//! url = "https://example.github.io/"            # Public base URL of the output
//! state_file = "encrypted_workflow_ids.json"    # Encrypted state, inside output
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigDiagnostics;

/// Published site settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    /// Public base URL every published address is relative to.
    pub url: Option<String>,

    /// File name of the encrypted state, both in the output and at `url`.
    pub state_file: String,
}

impl Default for SiteSectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            state_file: "encrypted_workflow_ids.json".to_string(),
        }
    }
}

impl SiteSectionConfig {
    /// Parsed base URL, always ending with `/` so addresses join below it.
    pub fn base_url(&self) -> Option<Url> {
        let raw = self.url.as_deref()?.trim();
        let with_slash = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        Url::parse(&with_slash)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    }

    pub fn validate(&self, require_url: bool, diag: &mut ConfigDiagnostics) {
        match &self.url {
            None if require_url => diag.error_with_hint(
                "site.url",
                "public base URL is required",
                "set [site] url or pass --site-url",
            ),
            Some(url) if self.base_url().is_none() => {
                diag.error("site.url", format!("not an absolute http(s) URL: {url}"));
            }
            _ => {}
        }

        let name = self.state_file.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            diag.error("site.state_file", "must be a plain file name");
        }
    }
}
