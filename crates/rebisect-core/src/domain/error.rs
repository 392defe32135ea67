//! Error taxonomy for rebisect.

use nix_plan::NixError;

use super::commit::CommitId;

/// rebisect errors.
#[derive(Debug, thiserror::Error)]
pub enum BisectError {
    #[error("cannot resolve {rev} to a commit: {reason}")]
    UnknownRevision { rev: String, reason: String },

    #[error("no bisection in progress (refs/bisect/bad is not set)")]
    NoBisectInProgress,

    #[error("no good commit marked (refs/bisect/good-* is empty)")]
    NoGoodCommits,

    #[error("git error: {0}")]
    Git(String),

    #[error("bisection range is empty")]
    EmptyRange,

    #[error("no rebuild set computed for {commit}")]
    MissingRebuildSet { commit: CommitId },

    #[error("computing rebuild set for {commit} failed: {source}")]
    RebuildSet {
        commit: CommitId,
        #[source]
        source: NixError,
    },

    #[error("worktree error: {0}")]
    Worktree(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rebisect operations.
pub type Result<T> = std::result::Result<T, BisectError>;
