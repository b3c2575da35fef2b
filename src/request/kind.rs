//! Redirect kind definitions.

use serde::{Deserialize, Serialize};

/// File extensions served as mirrored images instead of redirect pages.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Kind of artifact produced for a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectKind {
    /// HTML page forwarding the visitor to the source URL.
    Link,
    /// Locally hosted copy of the image at the source URL.
    Image,
}

impl RedirectKind {
    /// Infer the kind from the source URL's suffix (case-insensitive).
    ///
    /// - `auto_detect("foo.PNG")` -> `Image`
    /// - `auto_detect("foo.html")` -> `Link`
    /// - `auto_detect("foo")` -> `Link`
    pub fn auto_detect(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let is_image = IMAGE_EXTENSIONS.iter().any(|ext| {
            lower
                .strip_suffix(ext)
                .is_some_and(|rest| rest.ends_with('.'))
        });
        if is_image { Self::Image } else { Self::Link }
    }

    /// Resolve an explicit `type` value from a request document.
    ///
    /// Accepts the legacy `LINK`/`IMG` names as well as `image`, in any case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "link" => Some(Self::Link),
            "img" | "image" => Some(Self::Image),
            _ => None,
        }
    }

    /// Short name used for logging and progress counters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Image => "image",
        }
    }
}
