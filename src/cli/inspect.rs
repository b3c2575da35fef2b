//! `redirkit inspect`: print the plaintext mapping of an encrypted state file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::RedirConfig;
use crate::state::{GenerationState, StateKey, codec};
use crate::utils::path::resolve_path;

pub fn inspect_state(config: &RedirConfig, file: &Path) -> Result<()> {
    let key = StateKey::from_env(&config.state.key_env)
        .context("Cannot decrypt without the state key")?;
    let path = resolve_path(file, &config.build.output);
    let state = read_state(&path, &key)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn read_state(path: &Path, key: &StateKey) -> Result<GenerationState> {
    let blob = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    codec::decode(&blob, key).with_context(|| format!("Failed to decrypt {}", path.display()))
}
