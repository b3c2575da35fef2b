//! HTML attribute escaping for rendered redirect pages.

use std::borrow::Cow;

/// Characters with a meaning inside a quoted attribute value.
const ATTR_SPECIAL: [char; 5] = ['<', '>', '&', '"', '\''];

#[inline]
fn entity(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape `s` for use inside an HTML attribute value.
///
/// Borrows when nothing needs escaping.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(ATTR_SPECIAL) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match entity(c) {
            Some(entity) => escaped.push_str(entity),
            None => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
