//! Project configuration from `redirkit.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/   # [site], [build], [state]
//! ├── error      # ConfigError, ConfigDiagnostics
//! ├── util       # config file discovery
//! └── mod.rs     # RedirConfig (this file)
//! ```
//!
//! The loaded [`RedirConfig`] is passed by reference to every command; there
//! is no global handle.

pub mod section;
mod error;
mod util;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{BuildSectionConfig, SiteSectionConfig, StateSectionConfig};

use util::find_config_file;

use crate::cli::{Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing redirkit.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory, parent of the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteSectionConfig,

    #[serde(default)]
    pub build: BuildSectionConfig,

    #[serde(default)]
    pub state: StateSectionConfig,
}

impl RedirConfig {
    /// Load, override from the command line, normalize and validate.
    ///
    /// Searches upward from the current directory for the config file. When
    /// none is found, defaults apply with the current directory as root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config, &cwd) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                config
            }
            None => {
                log!("hint"; "{} not found, using defaults in {}", cli.config.display(), cwd.display());
                Self {
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.apply_cli(cli);
        let root = config.root.clone();
        config.build.normalize(&root);
        config.validate(matches!(cli.command, Commands::Build { .. }))?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy());
            log!("warning"; "ignoring unknown fields in {}: {}", name, ignored.join(", "));
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(output) = &cli.output {
            self.build.output = output.clone();
        }
        if let Some(data) = &cli.data {
            self.build.data = data.clone();
        }
        if let Commands::Build {
            site_url: Some(url),
            ..
        } = &cli.command
        {
            self.site.url = Some(url.clone());
        }
    }

    /// Validate every section, reporting all problems at once.
    pub fn validate(&self, for_build: bool) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.site.validate(for_build, &mut diag);
        self.build.validate(&self.root, &mut diag);
        self.state.validate(&mut diag);
        diag.into_result()
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// Public base URL with a trailing slash.
    pub fn base_url(&self) -> Option<Url> {
        self.site.base_url()
    }

    /// Where the previous generation's encrypted state is fetched from.
    pub fn state_url(&self) -> Option<String> {
        if let Some(url) = &self.state.url {
            return Some(url.clone());
        }
        let base = self.base_url()?;
        base.join(&self.site.state_file).ok().map(String::from)
    }

    /// Encrypted state file inside the output directory.
    pub fn encrypted_state_path(&self) -> PathBuf {
        self.build.output.join(&self.site.state_file)
    }

    pub const fn timeout(&self) -> Duration {
        self.build.timeout()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config snippet, panicking on unknown fields to catch typos.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> RedirConfig {
    let (parsed, ignored) = RedirConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn with_root(content: &str, root: &str) -> RedirConfig {
        let mut config = test_parse_config(content);
        config.root = PathBuf::from(root);
        config.build.normalize(Path::new(root));
        config
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(RedirConfig::parse_with_ignored("[site\nurl = 1").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[site]\nurl = \"https://pages.test/\"\n[deploy]\nforce = true";
        let (config, ignored) = RedirConfig::parse_with_ignored(content).unwrap();
        assert_eq!(config.site.url.as_deref(), Some("https://pages.test/"));
        assert!(ignored.iter().any(|f| f.contains("deploy")));
    }

    #[test]
    fn test_paths_resolved_against_root() {
        let config = with_root("[build]\noutput = \"public\"", "/srv/site");
        assert_eq!(config.build.output, PathBuf::from("/srv/site/public"));
        assert_eq!(
            config.encrypted_state_path(),
            PathBuf::from("/srv/site/public/encrypted_workflow_ids.json")
        );
        assert_eq!(config.build.plain_state, PathBuf::from("/srv/site/workflow_ids.json"));
    }

    #[test]
    fn test_state_url_defaults_to_site() {
        let config = with_root("[site]\nurl = \"https://pages.test/links\"", "/srv/site");
        assert_eq!(
            config.state_url().as_deref(),
            Some("https://pages.test/links/encrypted_workflow_ids.json")
        );
    }

    #[test]
    fn test_state_url_override() {
        let config = with_root(
            "[site]\nurl = \"https://pages.test/\"\n[state]\nurl = \"https://cdn.test/s.json\"",
            "/srv/site",
        );
        assert_eq!(config.state_url().as_deref(), Some("https://cdn.test/s.json"));
    }

    #[test]
    fn test_build_requires_site_url() {
        let config = with_root("", "/srv/site");
        assert!(config.validate(false).is_ok());
        assert!(matches!(
            config.validate(true),
            Err(ConfigError::Diagnostics(d)) if d.errors()[0].field == "site.url"
        ));
    }
}
