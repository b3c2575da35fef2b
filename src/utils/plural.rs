//! Pluralization for log messages.

/// Format count with noun: `1 redirect`, `0 redirects`, `5 redirects`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
