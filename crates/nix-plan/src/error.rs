//! Error types for nix-plan

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while planning rebuilds
#[derive(Error, Debug)]
pub enum NixError {
    /// Build command was empty
    #[error("no build command given")]
    EmptyCommand,

    /// Dry run exited with a non-zero status
    #[error("command `{command}` failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Workspace could not be moved to the requested commit
    #[error("failed to check out {commit}: {reason}")]
    Checkout { commit: String, reason: String },

    /// Plan cache entry exists but cannot be decoded
    #[error("corrupt plan cache entry {path:?}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    /// Derivation file is missing or unreadable, e.g. garbage-collected
    /// after its plan was cached
    #[error("cannot read derivation {path}: {source}")]
    DerivationUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Derivation file could not be interpreted
    #[error("invalid derivation {path}: {reason}")]
    InvalidDerivation { path: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
