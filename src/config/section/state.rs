//! `[state]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [state]
//! key_env = "ENCRYPTION_KEY"                          # Env var holding the key
//! url = "https://example.github.io/state.json"       # Optional override
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Continuity state settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSectionConfig {
    /// Environment variable holding the base64 encoded 32-byte key.
    pub key_env: String,

    /// Where the previous encrypted state is fetched from.
    /// Defaults to `site.url` + `site.state_file`.
    pub url: Option<String>,
}

impl Default for StateSectionConfig {
    fn default() -> Self {
        Self {
            key_env: "ENCRYPTION_KEY".to_string(),
            url: None,
        }
    }
}

impl StateSectionConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.key_env.trim().is_empty() {
            diag.error("state.key_env", "environment variable name must not be empty");
        }
        if let Some(url) = &self.url
            && url::Url::parse(url).is_err()
        {
            diag.error("state.url", format!("not a valid URL: {url}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_state_config() {
        let config = test_parse_config("[state]\nkey_env = \"REDIRECT_KEY\"");
        assert_eq!(config.state.key_env, "REDIRECT_KEY");
        assert_eq!(config.state.url, None);
    }
}
