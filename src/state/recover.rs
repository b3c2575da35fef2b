//! Recovering the previous run's state from the public store.

use thiserror::Error;

use super::{GenerationState, StateKey, codec};
use crate::materialize::{Fetch, FetchError};

/// Why continuity could not be restored. The run proceeds with an empty
/// prior state; only [`RecoveryError::Absent`] means there was nothing to lose.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no previous state at {url} (HTTP 404), is this a first run?")]
    Absent { url: String },

    #[error("previous state could not be fetched")]
    Fetch(#[source] FetchError),

    #[error("previous state could not be decoded")]
    Decode(#[source] codec::CodecError),
}

impl RecoveryError {
    /// Nothing was ever published at the state location.
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }
}

/// State recovered from the previous generation.
#[derive(Debug, Clone)]
pub struct PriorState {
    pub state: GenerationState,
    /// Encrypted blob as fetched, for republishing when no new mapping is written.
    pub blob: Vec<u8>,
}

/// Fetch the encrypted state at `url` and decrypt it with `key`.
pub fn recover_prior_state(
    fetcher: &dyn Fetch,
    url: &str,
    key: &StateKey,
) -> Result<PriorState, RecoveryError> {
    let blob = fetcher.fetch(url).map_err(|err| {
        if err.is_not_found() {
            RecoveryError::Absent {
                url: url.to_string(),
            }
        } else {
            RecoveryError::Fetch(err)
        }
    })?;
    let state = codec::decode(&blob, key).map_err(RecoveryError::Decode)?;
    Ok(PriorState { state, blob })
}
