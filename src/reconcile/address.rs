//! Published address minting and validation.
//!
//! Addresses are opaque handles built from a random 128-bit identifier:
//!
//! ```text
//! Image  https://x.test/banner.png  ->  3f0c9b1e-….png
//! Image  https://x.test/avatar      ->  3f0c9b1e-…
//! Link   https://x.test/info        ->  9a71d2c4-…/index.html
//! ```
//!
//! Uniqueness is probabilistic; a collision with an address already known to
//! this run is re-rolled, anything beyond that is an accepted risk.

use std::path::Path;

use url::Url;
use uuid::Uuid;

use crate::request::RedirectKind;
use crate::utils::path::is_safe_relative;

/// Document name of link artifacts inside their directory.
pub const LINK_INDEX: &str = "index.html";

/// Mint a fresh address for a request of `kind`.
pub fn mint_address(kind: RedirectKind, source_url: &str) -> String {
    let id = Uuid::new_v4().hyphenated().to_string();
    match kind {
        RedirectKind::Link => format!("{id}/{LINK_INDEX}"),
        RedirectKind::Image => match image_extension(source_url) {
            Some(ext) => format!("{id}.{ext}"),
            None => id,
        },
    }
}

/// Extension of the last path segment of `source_url`, without the dot.
///
/// Query and fragment are ignored: `https://x.test/a.png?v=2` -> `png`.
pub fn image_extension(source_url: &str) -> Option<String> {
    let path = match Url::parse(source_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => source_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segment = path.rsplit('/').next()?;
    let ext = Path::new(segment).extension()?.to_str()?;
    let valid = !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_string())
}

/// Whether a prior address has the artifact shape required by `kind`.
///
/// Links live in their own directory, images are flat files.
pub fn fits_kind(address: &str, kind: RedirectKind) -> bool {
    match kind {
        RedirectKind::Link => address
            .strip_suffix(LINK_INDEX)
            .and_then(|dir| dir.strip_suffix('/'))
            .is_some_and(|dir| !dir.is_empty() && !dir.contains('/')),
        RedirectKind::Image => !address.contains('/'),
    }
}

/// Bring a recovered address into relative form.
///
/// Older generations may have stored full URLs; those under `base` are
/// stripped to their relative part. Anything that cannot be safely written
/// below the output directory is rejected.
pub fn relativize(address: &str, base: Option<&Url>) -> Option<String> {
    if is_safe_relative(address) && Url::parse(address).is_err() {
        return Some(address.to_string());
    }
    let base = base?.as_str();
    let relative = address.strip_prefix(base)?;
    is_safe_relative(relative).then(|| relative.to_string())
}
