//! Writing the plaintext and encrypted state files.

use std::path::Path;

use anyhow::{Context, Result};

use super::GenerationState;
use crate::debug;
use crate::utils::write::write_atomic;

/// Write the plaintext mapping for operator inspection (pretty, stable order).
pub fn write_plain_state(path: &Path, state: &GenerationState) -> Result<()> {
    let mut json = serde_json::to_string_pretty(state)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to write plaintext state: {}", path.display()))?;
    debug!("state"; "wrote {}", path.display());
    Ok(())
}

/// Write an already encoded encrypted blob.
pub fn write_encrypted_state(path: &Path, blob: &[u8]) -> Result<()> {
    write_atomic(path, blob)
        .with_context(|| format!("Failed to write encrypted state: {}", path.display()))?;
    debug!("state"; "wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PublishedRedirect;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plain_state_is_pretty_and_ordered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workflow_ids.json");
        let mut state = GenerationState::new();
        state.extend_group("b", vec![PublishedRedirect::new("https://x.test", "1/index.html")]);
        state.extend_group("a", vec![PublishedRedirect::new("https://y.test", "2/index.html")]);

        write_plain_state(&path, &state).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());
        assert!(text.contains("\n    {"));
        let parsed: GenerationState = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_encrypted_state_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs/encrypted_workflow_ids.json");
        write_encrypted_state(&path, b"{\"x\":[]}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"x\":[]}");
    }
}
