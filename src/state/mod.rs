//! Generation state: which address each redirect is published at.
//!
//! | Module    | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `codec`   | Per-field AES-256-GCM encryption of the state       |
//! | `persist` | Plaintext and encrypted state files                 |
//! | `recover` | Fetch and decrypt the previous run's state          |
//!
//! # Persisted shape
//!
//! Both forms serialize as a JSON object keyed by owner group, preserving
//! declaration order so the plaintext file diffs cleanly between runs:
//!
//! ```json
//! {
//!   "teamA": [
//!     { "from": "https://x.test/banner.png", "to": "3f0c….png", "previous_to": "3f0c….png" },
//!     { "from": "https://x.test/info", "to": "9a71…/index.html" }
//!   ]
//! }
//! ```

pub mod codec;
mod persist;
mod recover;

pub use codec::StateKey;
pub use persist::{write_encrypted_state, write_plain_state};
pub use recover::{PriorState, recover_prior_state};

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Durable outcome of one redirect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRedirect {
    #[serde(rename = "from")]
    pub source_url: String,

    /// Relative path of the artifact inside the published output.
    #[serde(rename = "to")]
    pub address: String,

    /// Address held in the previous generation, kept for staged client migration.
    #[serde(rename = "previous_to", default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl PublishedRedirect {
    pub fn new(source_url: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            address: address.into(),
            previous: None,
        }
    }

    pub fn with_previous(mut self, previous: impl Into<String>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    fn try_map<E>(&self, f: &mut impl FnMut(&str) -> Result<String, E>) -> Result<Self, E> {
        Ok(Self {
            source_url: f(&self.source_url)?,
            address: f(&self.address)?,
            previous: self.previous.as_deref().map(&mut *f).transpose()?,
        })
    }
}

/// Redirects of one owner group, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerState {
    pub owner: String,
    pub redirects: Vec<PublishedRedirect>,
}

/// Mapping owner group -> ordered published redirects.
///
/// Groups keep insertion order; an owner appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationState {
    groups: Vec<OwnerState>,
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append redirects to `owner`, creating the group if needed.
    ///
    /// An empty `redirects` list never creates a group.
    pub fn extend_group(&mut self, owner: &str, redirects: Vec<PublishedRedirect>) {
        if redirects.is_empty() {
            return;
        }
        match self.groups.iter_mut().find(|g| g.owner == owner) {
            Some(group) => group.redirects.extend(redirects),
            None => self.groups.push(OwnerState {
                owner: owner.to_string(),
                redirects,
            }),
        }
    }

    /// Redirects published for `owner`, if any.
    pub fn group(&self, owner: &str) -> Option<&[PublishedRedirect]> {
        self.groups
            .iter()
            .find(|g| g.owner == owner)
            .map(|g| g.redirects.as_slice())
    }

    /// Find the redirect published for `(owner, source_url)`.
    pub fn find(&self, owner: &str, source_url: &str) -> Option<&PublishedRedirect> {
        self.group(owner)?
            .iter()
            .find(|r| r.source_url == source_url)
    }

    /// Every `(owner, redirect)` pair in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PublishedRedirect)> {
        self.groups
            .iter()
            .flat_map(|g| g.redirects.iter().map(move |r| (g.owner.as_str(), r)))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn redirect_count(&self) -> usize {
        self.groups.iter().map(|g| g.redirects.len()).sum()
    }

    /// Apply `f` to every string field, keeping structure and order.
    ///
    /// Groups whose mapped owner collides with an earlier one are merged.
    pub fn try_map_strings<E>(
        &self,
        mut f: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<Self, E> {
        let mut mapped = Self::new();
        for group in &self.groups {
            let owner = f(&group.owner)?;
            let redirects = group
                .redirects
                .iter()
                .map(|r| r.try_map(&mut f))
                .collect::<Result<Vec<_>, E>>()?;
            mapped.extend_group(&owner, redirects);
        }
        Ok(mapped)
    }
}

impl Serialize for GenerationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.owner, &group.redirects)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GenerationState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StateVisitor;

        impl<'de> Visitor<'de> for StateVisitor {
            type Value = GenerationState;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of owner group to redirect list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut state = GenerationState::new();
                while let Some((owner, redirects)) =
                    access.next_entry::<String, Vec<PublishedRedirect>>()?
                {
                    state.extend_group(&owner, redirects);
                }
                Ok(state)
            }
        }

        deserializer.deserialize_map(StateVisitor)
    }
}
