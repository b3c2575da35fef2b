//! Redirect page template.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::utils::html::escape_attr;

/// Token replaced by the redirect target in the page template.
const PLACEHOLDER: &str = "||redirect_url||";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error when reading template `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("template `{0}` does not contain the `||redirect_url||` placeholder")]
    MissingPlaceholder(PathBuf),
}

/// HTML page forwarding to a single target URL.
#[derive(Debug, Clone)]
pub struct RedirectTemplate {
    content: String,
}

impl RedirectTemplate {
    /// Read the template once per run.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content =
            fs::read_to_string(path).map_err(|err| TemplateError::Io(path.to_path_buf(), err))?;
        Self::new(content).ok_or_else(|| TemplateError::MissingPlaceholder(path.to_path_buf()))
    }

    /// Wrap template text; `None` if the placeholder is absent.
    pub fn new(content: impl Into<String>) -> Option<Self> {
        let content = content.into();
        content.contains(PLACEHOLDER).then_some(Self { content })
    }

    /// Render the page for `target`, escaped for an attribute value.
    pub fn render(&self, target: &str) -> String {
        self.content.replace(PLACEHOLDER, &escape_attr(target))
    }
}
