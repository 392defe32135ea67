//! In-memory commit history for tests and offline estimation.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{BisectError, CommitId, Result};
use crate::range::RangeResolver;

/// Commit DAG held as a parent map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    parents: BTreeMap<CommitId, Vec<CommitId>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain where each commit is the parent of the next: `ids[0]` is the root.
    pub fn linear(ids: &[&str]) -> Self {
        let mut history = Self::new();
        let mut parent: Option<&str> = None;
        for id in ids {
            let parents: Vec<&str> = parent.into_iter().collect();
            history.add_commit(id, &parents);
            parent = Some(*id);
        }
        history
    }

    /// Add `id` with the given parents. Parents need not exist yet.
    pub fn add_commit(&mut self, id: &str, parents: &[&str]) -> &mut Self {
        self.parents.insert(
            CommitId::new(id),
            parents.iter().map(|p| CommitId::new(*p)).collect(),
        );
        self
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.parents.contains_key(id)
    }

    /// `id` and all of its ancestors.
    pub fn ancestors(&self, id: &CommitId) -> Result<BTreeSet<CommitId>> {
        if !self.contains(id) {
            return Err(BisectError::UnknownRevision {
                rev: id.to_string(),
                reason: "not in history".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut stack = vec![id.clone()];
        while let Some(commit) = stack.pop() {
            if !seen.insert(commit.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&commit) {
                stack.extend(parents.iter().cloned());
            }
        }
        Ok(seen)
    }
}

impl RangeResolver for InMemoryHistory {
    /// Sorted by commit id.
    fn range(&self, bad: &CommitId, goods: &[CommitId]) -> Result<Vec<CommitId>> {
        let mut candidates = self.ancestors(bad)?;
        candidates.remove(bad);
        for good in goods {
            for ancestor in self.ancestors(good)? {
                candidates.remove(&ancestor);
            }
        }
        Ok(candidates.into_iter().collect())
    }
}
