//! Reconciliation: assigning stable published addresses.
//!
//! For each declared redirect, in declaration order:
//!
//! 1. look up `(owner group, source URL)` in the prior state
//! 2. found: reuse its address (also recorded as `previous_to`)
//! 3. not found: mint a fresh address
//! 4. materialize the artifact at that address
//! 5. keep the redirect only if materialization succeeded
//!
//! Resolution is sequential, materialization runs on the rayon pool, and the
//! results are merged back by the calling thread alone, so the resulting
//! [`GenerationState`] has a single writer and a deterministic order.

mod address;
mod retired;


use address::{fits_kind, mint_address, relativize};
pub use retired::RetiredOutcome;

use std::path::Path;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use url::Url;

use crate::logger::ProgressLine;
use crate::materialize::Materialize;
use crate::request::{RedirectKind, RedirectRequest, RequestGroup};
use crate::state::{GenerationState, PublishedRedirect};
use crate::{debug, log};

/// Counters describing one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Redirects that kept their prior address.
    pub reused: usize,
    /// Redirects that received a new address.
    pub minted: usize,
    /// Redirects dropped because materialization failed.
    pub dropped: usize,
}

impl ReconcileStats {
    pub const fn published(&self) -> usize {
        self.reused + self.minted
    }
}

/// Result of [`Reconciler::reconcile`].
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub state: GenerationState,
    pub stats: ReconcileStats,
}

/// A resolved request waiting to be materialized.
#[derive(Debug)]
struct Planned<'r> {
    group: usize,
    request: &'r RedirectRequest,
    address: String,
    previous: Option<String>,
}

/// Drives address resolution and materialization for one run.
pub struct Reconciler<'a, M: Materialize> {
    materializer: &'a M,
    output_root: &'a Path,
    base_url: Option<&'a Url>,
    progress: bool,
}

impl<'a, M: Materialize> Reconciler<'a, M> {
    pub fn new(materializer: &'a M, output_root: &'a Path) -> Self {
        Self {
            materializer,
            output_root,
            base_url: None,
            progress: false,
        }
    }

    /// Public base URL, used to read absolute addresses from older state.
    pub fn with_base_url(mut self, base_url: &'a Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Show a progress line while materializing.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Resolve, materialize and collect every request into a new state.
    ///
    /// Groups with no successful redirect are omitted from the result.
    pub fn reconcile(&self, groups: &[RequestGroup], prior: &GenerationState) -> Reconciliation {
        let (plan, mut stats) = self.plan(groups, prior);

        let results = self.materialize_all(&plan);

        let mut published: Vec<Vec<PublishedRedirect>> = vec![Vec::new(); groups.len()];
        for (planned, result) in plan.into_iter().zip(results) {
            let request = planned.request;
            match result {
                Ok(()) => {
                    let mut redirect = PublishedRedirect::new(&request.source_url, planned.address);
                    redirect.previous = planned.previous;
                    published[planned.group].push(redirect);
                }
                Err(err) => {
                    log!("warn"; "dropping {} ({}): {}", request.source_url, request.owner, err);
                    if planned.previous.is_some() {
                        stats.reused -= 1;
                    } else {
                        stats.minted -= 1;
                    }
                    stats.dropped += 1;
                }
            }
        }

        let mut state = GenerationState::new();
        for (group, redirects) in groups.iter().zip(published) {
            state.extend_group(&group.owner, redirects);
        }

        Reconciliation { state, stats }
    }

    /// Assign an address to every request without touching the filesystem.
    fn plan<'r>(
        &self,
        groups: &'r [RequestGroup],
        prior: &GenerationState,
    ) -> (Vec<Planned<'r>>, ReconcileStats) {
        let index = self.prior_index(prior);
        // Every prior address stays off-limits for minting, declared again or not
        let mut taken: FxHashSet<String> = index.values().cloned().collect();
        let mut assigned: FxHashSet<String> = FxHashSet::default();
        let mut stats = ReconcileStats::default();
        let mut plan = Vec::new();

        for (slot, group) in groups.iter().enumerate() {
            for request in &group.requests {
                let key = (request.owner.as_str(), request.source_url.as_str());
                let reusable = index
                    .get(&key)
                    .filter(|address| fits_kind(address, request.kind))
                    .filter(|address| !assigned.contains(address.as_str()));

                let (address, previous) = match reusable {
                    Some(address) => {
                        stats.reused += 1;
                        (address.clone(), Some(address.clone()))
                    }
                    None => {
                        if index.contains_key(&key) {
                            debug!("reconcile"; "prior address of {} does not fit a {}, minting", request.source_url, request.kind.as_str());
                        }
                        stats.minted += 1;
                        (mint_unique(request.kind, &request.source_url, &taken), None)
                    }
                };

                taken.insert(address.clone());
                assigned.insert(address.clone());
                plan.push(Planned {
                    group: slot,
                    request,
                    address,
                    previous,
                });
            }
        }

        (plan, stats)
    }

    /// Index prior redirects by identity, keeping only addresses safe to reuse.
    fn prior_index<'p>(&self, prior: &'p GenerationState) -> FxHashMap<(&'p str, &'p str), String> {
        let mut index = FxHashMap::default();
        for (owner, redirect) in prior.entries() {
            match relativize(&redirect.address, self.base_url) {
                Some(address) => {
                    index
                        .entry((owner, redirect.source_url.as_str()))
                        .or_insert(address);
                }
                None => {
                    log!("warn"; "ignoring unusable prior address for {}: {}", redirect.source_url, redirect.address);
                }
            }
        }
        index
    }

    fn materialize_all(&self, plan: &[Planned<'_>]) -> Vec<Result<(), crate::materialize::MaterializeError>> {
        let progress = self.progress.then(|| {
            let images = plan
                .iter()
                .filter(|p| p.request.kind == RedirectKind::Image)
                .count();
            ProgressLine::new(&[
                (RedirectKind::Image.as_str(), images),
                (RedirectKind::Link.as_str(), plan.len() - images),
            ])
        });

        // Distinct addresses: parallel calls write disjoint paths
        let results = plan
            .par_iter()
            .map(|planned| {
                let result = self.materializer.materialize(
                    planned.request.kind,
                    &planned.request.source_url,
                    &planned.address,
                    self.output_root,
                );
                if let Some(progress) = &progress {
                    progress.inc(planned.request.kind.as_str());
                }
                result
            })
            .collect();

        if let Some(progress) = progress {
            progress.finish();
        }
        results
    }
}

fn mint_unique(kind: RedirectKind, source_url: &str, taken: &FxHashSet<String>) -> String {
    loop {
        let address = mint_address(kind, source_url);
        if !taken.contains(&address) {
            return address;
        }
    }
}
