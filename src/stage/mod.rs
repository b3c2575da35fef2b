//! Output staging: reset the output directory from the base skeleton.
//!
//! Runs once per build, before any artifact is materialized. Kept behind
//! [`StageOutput`] so the reconciliation core never depends on how the output
//! directory is prepared.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jwalk::WalkDir;

use crate::utils::plural_count;
use crate::{debug, log};

/// Prepares an empty output directory for a new generation.
pub trait StageOutput {
    fn stage(&self, output: &Path) -> Result<()>;
}

/// Replace the output directory with a copy of a skeleton directory.
#[derive(Debug, Clone)]
pub struct SkeletonStage {
    base: PathBuf,
}

impl SkeletonStage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl StageOutput for SkeletonStage {
    fn stage(&self, output: &Path) -> Result<()> {
        if output.exists() {
            fs::remove_dir_all(output).with_context(|| {
                format!("Failed to clear output directory: {}", output.display())
            })?;
        }
        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

        if !self.base.is_dir() {
            log!("warn"; "base skeleton {} not found, starting from an empty output", self.base.display());
            return Ok(());
        }

        let copied = copy_tree(&self.base, output)?;
        debug!("stage"; "copied {} from {}", plural_count(copied, "file"), self.base.display());
        Ok(())
    }
}

/// Copy every file under `from` into `to`, keeping relative paths.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort(true).into_iter() {
        let entry = entry.with_context(|| format!("Failed to read {}", from.display()))?;
        let path = entry.path();
        let rel = path.strip_prefix(from)?;
        let target = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
