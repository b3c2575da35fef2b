//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! data = "data"                           # Scanned for *redirects.json
//! base = "gh-pages-base"                  # Skeleton copied into output
//! output = "docs"                         # Replaced on every build
//! template = "templates/redirect.html"    # Must contain ||redirect_url||
//! plain_state = "workflow_ids.json"       # Plaintext mapping, never published
//! timeout = 30                            # Seconds per fetch attempt
//! retries = 2                             # Extra attempts on transient failures
//! jobs = 0                                # Materializer threads (0 = all cores)
//! keep_retired = true                     # Keep dropped artifacts one more run
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::utils::path::expand_path;

/// Build paths and materialization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Directory scanned for request documents.
    pub data: PathBuf,

    /// Skeleton directory copied into the output before generation.
    pub base: PathBuf,

    /// Output directory, fully replaced each run.
    pub output: PathBuf,

    /// Redirect page template.
    pub template: PathBuf,

    /// Plaintext state file for operators.
    pub plain_state: PathBuf,

    /// Per-attempt fetch timeout in seconds.
    pub timeout: u64,

    /// Extra attempts for transient fetch failures.
    pub retries: u32,

    /// Materializer thread count, 0 for the rayon default.
    pub jobs: usize,

    /// Mirror artifacts of retired redirects for one more generation.
    pub keep_retired: bool,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            data: "data".into(),
            base: "gh-pages-base".into(),
            output: "docs".into(),
            template: "templates/redirect.html".into(),
            plain_state: "workflow_ids.json".into(),
            timeout: 30,
            retries: 2,
            jobs: 0,
            keep_retired: true,
        }
    }
}

impl BuildSectionConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Resolve every path against the project root.
    pub fn normalize(&mut self, root: &Path) {
        for path in [
            &mut self.data,
            &mut self.base,
            &mut self.output,
            &mut self.template,
            &mut self.plain_state,
        ] {
            *path = expand_path(path, root);
        }
    }

    /// Validate normalized paths and limits.
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.timeout == 0 {
            diag.error("build.timeout", "must be at least 1 second");
        }

        // The output is deleted on every build
        if root.starts_with(&self.output) {
            diag.error_with_hint(
                "build.output",
                format!("{} contains the project root", self.output.display()),
                "point output to a dedicated directory such as \"docs\"",
            );
        }
        for (field, path) in [
            ("build.data", &self.data),
            ("build.base", &self.base),
            ("build.template", &self.template),
            ("build.plain_state", &self.plain_state),
        ] {
            if path.starts_with(&self.output) {
                diag.error(field, format!("{} lies inside the output directory", path.display()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.output, PathBuf::from("docs"));
        assert_eq!(config.build.timeout(), Duration::from_secs(30));
        assert!(config.build.keep_retired);
    }

    #[test]
    fn test_build_config_custom() {
        let config = test_parse_config("[build]\noutput = \"public\"\ntimeout = 5\nkeep_retired = false");
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.build.timeout, 5);
        assert!(!config.build.keep_retired);
    }

    #[test]
    fn test_validate_rejects_output_over_root() {
        let mut build = BuildSectionConfig {
            output: ".".into(),
            ..Default::default()
        };
        build.normalize(Path::new("/site"));

        let mut diag = ConfigDiagnostics::new();
        build.validate(Path::new("/site"), &mut diag);
        assert!(diag.errors().iter().any(|e| e.field == "build.output"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut build = BuildSectionConfig {
            timeout: 0,
            ..Default::default()
        };
        build.normalize(Path::new("/site"));

        let mut diag = ConfigDiagnostics::new();
        build.validate(Path::new("/site"), &mut diag);
        assert_eq!(diag.errors().len(), 1);
    }
}
