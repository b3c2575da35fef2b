//! Artifact materialization: turning a resolved redirect into a file.
//!
//! | Kind    | Artifact at `output/<address>`                      |
//! |---------|-----------------------------------------------------|
//! | `Image` | bytes of the source URL, unmodified                 |
//! | `Link`  | redirect template rendered with the source URL      |
//!
//! Link targets are rendered as declared, whatever their scheme, except for
//! schemes that run code in the page (`javascript:`, `data:`, `vbscript:`).
//!
//! Every artifact is written atomically: a failed call leaves nothing behind.

mod fetch;
mod render;

pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use render::RedirectTemplate;

#[cfg(test)]
pub(crate) use fetch::testing;

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::request::RedirectKind;
use crate::utils::path::is_safe_relative;
use crate::utils::write::write_atomic;

/// Failure to produce one artifact. The redirect is dropped, the run continues.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{0}` is not an allowed link target")]
    InvalidUrl(String),

    #[error("refusing to write outside the output directory: {0}")]
    UnsafeAddress(String),
}

/// Produces the on-disk artifact for a resolved redirect.
///
/// Calls for distinct addresses touch disjoint paths and may run in parallel.
pub trait Materialize: Sync {
    fn materialize(
        &self,
        kind: RedirectKind,
        source_url: &str,
        address: &str,
        output_root: &Path,
    ) -> Result<(), MaterializeError>;

    /// Copy the bytes at `url` to `output_root/address`.
    fn mirror(&self, url: &str, address: &str, output_root: &Path) -> Result<(), MaterializeError>;
}

/// Default materializer: HTTP fetch for images, template rendering for links.
pub struct Materializer<'a> {
    fetcher: &'a dyn Fetch,
    template: &'a RedirectTemplate,
}

impl<'a> Materializer<'a> {
    pub fn new(fetcher: &'a dyn Fetch, template: &'a RedirectTemplate) -> Self {
        Self { fetcher, template }
    }
}

impl Materialize for Materializer<'_> {
    fn materialize(
        &self,
        kind: RedirectKind,
        source_url: &str,
        address: &str,
        output_root: &Path,
    ) -> Result<(), MaterializeError> {
        match kind {
            RedirectKind::Image => self.mirror(source_url, address, output_root),
            RedirectKind::Link => {
                check_link_target(source_url)?;
                let page = self.template.render(source_url);
                write_artifact(output_root, address, page.as_bytes())
            }
        }
    }

    fn mirror(&self, url: &str, address: &str, output_root: &Path) -> Result<(), MaterializeError> {
        if !is_safe_relative(address) {
            return Err(MaterializeError::UnsafeAddress(address.to_string()));
        }
        let bytes = self.fetcher.fetch(url)?;
        write_artifact(output_root, address, &bytes)
    }
}

/// Schemes a forwarding page must never point at.
const BLOCKED_SCHEMES: [&str; 3] = ["javascript", "data", "vbscript"];

/// Reject targets whose scheme would execute in the rendered page.
///
/// Browsers ignore whitespace and control characters inside a scheme, so they
/// are stripped before comparing.
fn check_link_target(source_url: &str) -> Result<(), MaterializeError> {
    let cleaned: String = source_url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();

    if let Some((scheme, _)) = cleaned.split_once(':')
        && BLOCKED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
    {
        return Err(MaterializeError::InvalidUrl(source_url.to_string()));
    }
    Ok(())
}

/// Write `bytes` at `output_root/address`, removing any directory this call created on failure.
fn write_artifact(output_root: &Path, address: &str, bytes: &[u8]) -> Result<(), MaterializeError> {
    if !is_safe_relative(address) {
        return Err(MaterializeError::UnsafeAddress(address.to_string()));
    }

    let path = output_root.join(address);
    let created_dir = path
        .parent()
        .filter(|parent| *parent != output_root && !parent.exists());

    write_atomic(&path, bytes).map_err(|source| {
        if let Some(dir) = created_dir {
            let _ = fs::remove_dir(dir);
        }
        MaterializeError::Write {
            path: address.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use super::testing::MemoryFetcher;

    fn template() -> RedirectTemplate {
        RedirectTemplate::new("<a href=\"||redirect_url||\">go</a>").unwrap()
    }

    #[test]
    fn test_image_written_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default().with("https://x.test/banner.png", vec![0x89, b'P', 0]);
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        materializer
            .materialize(RedirectKind::Image, "https://x.test/banner.png", "id.png", dir.path())
            .unwrap();

        assert_eq!(fs::read(dir.path().join("id.png")).unwrap(), vec![0x89, b'P', 0]);
    }

    #[test]
    fn test_link_page_rendered() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        materializer
            .materialize(RedirectKind::Link, "https://x.test/info", "id/index.html", dir.path())
            .unwrap();

        let html = fs::read_to_string(dir.path().join("id/index.html")).unwrap();
        assert_eq!(html, "<a href=\"https://x.test/info\">go</a>");
        assert!(fetcher.requests.lock().is_empty());
    }

    #[test]
    fn test_link_target_rendered_as_declared() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        for (target, address) in [
            ("steam://openurl/https://x.test/mod", "a/index.html"),
            ("https://x.test", "b/index.html"),
        ] {
            materializer
                .materialize(RedirectKind::Link, target, address, dir.path())
                .unwrap();
        }

        let steam = fs::read_to_string(dir.path().join("a/index.html")).unwrap();
        assert_eq!(steam, "<a href=\"steam://openurl/https://x.test/mod\">go</a>");
        let web = fs::read_to_string(dir.path().join("b/index.html")).unwrap();
        assert_eq!(web, "<a href=\"https://x.test\">go</a>");
    }

    #[test]
    fn test_link_target_is_escaped() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        materializer
            .materialize(
                RedirectKind::Link,
                "https://x.test/a\"><script>",
                "id/index.html",
                dir.path(),
            )
            .unwrap();

        let html = fs::read_to_string(dir.path().join("id/index.html")).unwrap();
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_failed_fetch_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        let err = materializer
            .materialize(RedirectKind::Image, "https://x.test/gone.png", "id.png", dir.path())
            .unwrap_err();

        assert!(matches!(err, MaterializeError::Fetch(FetchError::Status { status: 404, .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_removes_created_directory() {
        let dir = TempDir::new().unwrap();
        // A directory already sits where the file must go
        fs::create_dir_all(dir.path().join("id/index.html/blocker")).unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        let err = materializer
            .materialize(RedirectKind::Link, "https://x.test", "id/index.html", dir.path())
            .unwrap_err();
        assert!(matches!(err, MaterializeError::Write { .. }));

        // Pre-existing directories are left alone
        assert!(dir.path().join("id/index.html/blocker").exists());
    }

    #[test]
    fn test_rejects_script_schemes_and_unsafe_addresses() {
        let dir = TempDir::new().unwrap();
        let fetcher = MemoryFetcher::default();
        let template = template();
        let materializer = Materializer::new(&fetcher, &template);

        for target in [
            "javascript:alert(1)",
            " JavaScript:alert(1)",
            "java\tscript:alert(1)",
            "data:text/html,<script>",
            "VBScript:msgbox",
        ] {
            assert!(
                matches!(
                    materializer.materialize(RedirectKind::Link, target, "a/index.html", dir.path()),
                    Err(MaterializeError::InvalidUrl(_))
                ),
                "{target}"
            );
        }
        assert!(!dir.path().join("a").exists());
        assert!(matches!(
            materializer.materialize(RedirectKind::Link, "https://x.test", "../escape/index.html", dir.path()),
            Err(MaterializeError::UnsafeAddress(_))
        ));
    }
}
