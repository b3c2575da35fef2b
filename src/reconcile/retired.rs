//! Carry-over of retired artifacts.
//!
//! A redirect that disappears from the declarations (or fails to regenerate)
//! loses its entry in the new state, but clients may still hold its address.
//! Its previously published artifact is mirrored from the public site into the
//! new output for one more generation.

use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::{Reconciler, relativize};
use crate::materialize::Materialize;
use crate::state::GenerationState;
use crate::{debug, log};

/// Counters for [`Reconciler::carry_over_retired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetiredOutcome {
    pub kept: usize,
    pub failed: usize,
}

impl<M: Materialize> Reconciler<'_, M> {
    /// Mirror prior artifacts whose address is not used by `current`.
    ///
    /// Requires a base URL; without one nothing is carried over.
    pub fn carry_over_retired(
        &self,
        prior: &GenerationState,
        current: &GenerationState,
    ) -> RetiredOutcome {
        let Some(base) = self.base_url else {
            debug!("retired"; "no base url, skipping carry-over");
            return RetiredOutcome::default();
        };

        let in_use: FxHashSet<&str> = current.entries().map(|(_, r)| r.address.as_str()).collect();
        let mut seen = FxHashSet::default();
        let retired: Vec<String> = prior
            .entries()
            .filter_map(|(_, r)| relativize(&r.address, Some(base)))
            .filter(|address| !in_use.contains(address.as_str()))
            .filter(|address| seen.insert(address.clone()))
            .collect();

        if retired.is_empty() {
            return RetiredOutcome::default();
        }

        let results: Vec<bool> = retired
            .par_iter()
            .map(|address| {
                let result = base
                    .join(address)
                    .map_err(|err| err.to_string())
                    .and_then(|url| {
                        self.materializer
                            .mirror(url.as_str(), address, self.output_root)
                            .map_err(|err| err.to_string())
                    });
                match result {
                    Ok(()) => true,
                    Err(err) => {
                        log!("warn"; "could not keep retired artifact {}: {}", address, err);
                        false
                    }
                }
            })
            .collect();

        let kept = results.iter().filter(|ok| **ok).count();
        RetiredOutcome {
            kept,
            failed: results.len() - kept,
        }
    }
}
