//! Cost estimate records.

use serde::{Deserialize, Serialize};

use super::commit::CommitId;

/// What remains if a candidate is marked one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchEstimate {
    /// Commits left to search.
    pub candidates: usize,
    /// Artifacts those commits need beyond the candidate's own rebuild set.
    pub rebuilds: usize,
}

/// Estimated cost of testing one commit next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub commit: CommitId,
    pub cost: f64,
    /// Size of the commit's own rebuild set.
    pub own_rebuilds: usize,
    pub if_good: BranchEstimate,
    pub if_bad: BranchEstimate,
}
