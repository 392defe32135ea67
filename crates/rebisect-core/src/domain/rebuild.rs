//! Per-commit rebuild sets.

use std::collections::{BTreeMap, BTreeSet};

use super::commit::{ArtifactId, CommitId};
use super::error::{BisectError, Result};

/// Artifacts a commit still needs built. Already-built artifacts are
/// removed before a set is stored, so this is remaining work only.
pub type RebuildSet = BTreeSet<ArtifactId>;

/// Rebuild set of every commit in the search range.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildTable {
    sets: BTreeMap<CommitId, RebuildSet>,
}

impl RebuildTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, commit: CommitId, set: RebuildSet) {
        self.sets.insert(commit, set);
    }

    pub fn get(&self, commit: &CommitId) -> Option<&RebuildSet> {
        self.sets.get(commit)
    }

    /// Rebuild set for `commit`, or `MissingRebuildSet`.
    pub fn require(&self, commit: &CommitId) -> Result<&RebuildSet> {
        self.sets
            .get(commit)
            .ok_or_else(|| BisectError::MissingRebuildSet {
                commit: commit.clone(),
            })
    }

    pub fn contains(&self, commit: &CommitId) -> bool {
        self.sets.contains_key(commit)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommitId, &RebuildSet)> {
        self.sets.iter()
    }

    /// Number of artifacts in `⋃ table[d] for d in commits` that are not in
    /// `exclude`.
    pub fn union_size_excluding<'a, I>(&self, commits: I, exclude: &RebuildSet) -> Result<usize>
    where
        I: IntoIterator<Item = &'a CommitId>,
    {
        let mut union: BTreeSet<&ArtifactId> = BTreeSet::new();
        for commit in commits {
            union.extend(self.require(commit)?.iter().filter(|a| !exclude.contains(*a)));
        }
        Ok(union.len())
    }
}

impl FromIterator<(CommitId, RebuildSet)> for RebuildTable {
    fn from_iter<T: IntoIterator<Item = (CommitId, RebuildSet)>>(iter: T) -> Self {
        Self {
            sets: iter.into_iter().collect(),
        }
    }
}
