// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Managed set resolution.
//!
//! The managed set is whatever version control says is tracked in the
//! repository, passed through the path classifier. It is recomputed for each
//! command, never cached between runs.

use crate::{
    path::{normalize, ManagedPath},
    vcs::{Vcs, VcsError},
};

use std::{collections::BTreeSet, path::Path};
use tracing::{debug, instrument};

/// Sorted set of managed paths.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ManagedSet(BTreeSet<ManagedPath>);

impl ManagedSet {
    /// Load managed set from repository.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError`] if tracked files cannot be listed.
    #[instrument(skip(vcs), level = "debug")]
    pub fn load(vcs: &dyn Vcs, repo: &Path) -> Result<Self, VcsError> {
        let set = Self::from_tracked(vcs.tracked_files(repo)?);
        debug!("loaded {} managed paths", set.len());

        Ok(set)
    }

    /// Build managed set from raw tracked entries.
    ///
    /// Entries rejected by [`normalize`] are dropped, including anything
    /// under repository metadata.
    pub fn from_tracked(entries: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self(
            entries
                .into_iter()
                .filter_map(|entry| match normalize(entry.as_ref()) {
                    Ok(rel) => Some(rel),
                    Err(error) => {
                        debug!("drop tracked entry {:?}: {error}", entry.as_ref());
                        None
                    }
                })
                .collect(),
        )
    }

    pub fn contains(&self, rel: &ManagedPath) -> bool {
        self.0.contains(rel)
    }

    /// Add path, returning false if it was already managed.
    pub fn insert(&mut self, rel: ManagedPath) -> bool {
        self.0.insert(rel)
    }

    /// Drop path, returning false if it was not managed.
    pub fn remove(&mut self, rel: &ManagedPath) -> bool {
        self.0.remove(rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagedPath> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Managed paths as plain strings, sorted.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl<'set> IntoIterator for &'set ManagedSet {
    type Item = &'set ManagedPath;
    type IntoIter = std::collections::btree_set::Iter<'set, ManagedPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Check if repository holds nothing worth reconciling yet.
///
/// True when there is no history, or when no tracked path survives the path
/// classifier.
///
/// # Errors
///
/// - Return [`VcsError`] if repository cannot be inspected.
pub fn repo_is_empty(vcs: &dyn Vcs, repo: &Path) -> Result<bool, VcsError> {
    if vcs.head(repo)?.is_none() {
        return Ok(true);
    }

    Ok(ManagedSet::load(vcs, repo)?.is_empty())
}
