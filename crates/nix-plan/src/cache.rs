//! Persistent plan cache
//!
//! One file per (commit, command) pair, named by the SHA-256 of the
//! JSON-encoded key. Entries hold the raw derivation set reported by the
//! dry run, before the built-derivation filter is applied. There is no
//! invalidation: delete the directory when the command starts depending on
//! files outside the checkout.

use crate::drv::DrvPath;
use crate::error::NixError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Memoization key for a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub commit: String,
    pub command: Vec<String>,
}

impl CacheKey {
    pub fn new(commit: &str, command: &[String]) -> Self {
        CacheKey {
            commit: commit.to_string(),
            command: command.to_vec(),
        }
    }

    /// Hex SHA-256 of `[commit, [tokens...]]`.
    ///
    /// JSON string quoting keeps `["a","bc"]` and `["ab","c"]` apart.
    pub fn digest(&self) -> String {
        let encoded = serde_json::to_vec(&(&self.commit, &self.command))
            .expect("a tuple of strings always serializes");
        hex::encode(Sha256::digest(&encoded))
    }
}

/// Cached dry-run result as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub commit: String,
    pub command: Vec<String>,
    pub drvs: BTreeSet<DrvPath>,
}

/// Directory-backed plan cache
#[derive(Debug, Clone)]
pub struct PlanCache {
    dir: PathBuf,
}

impl PlanCache {
    /// Open a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PlanCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.digest())
    }

    /// Cached derivation set for `key`, if any.
    ///
    /// An entry that exists but does not decode is an error, not a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<BTreeSet<DrvPath>>> {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(commit = %key.commit, "plan cache miss");
                return Ok(None);
            }
            Err(e) => return Err(NixError::Io(e)),
        };

        let entry: CacheEntry =
            serde_json::from_slice(&bytes).map_err(|e| NixError::CacheCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if entry.commit != key.commit || entry.command != key.command {
            return Err(NixError::CacheCorrupt {
                path,
                reason: format!("entry belongs to commit {}", entry.commit),
            });
        }

        debug!(commit = %key.commit, drvs = entry.drvs.len(), "plan cache hit");
        Ok(Some(entry.drvs))
    }

    /// Store `drvs` under `key`.
    ///
    /// Written to a temp file in the cache directory and renamed into place,
    /// so concurrent readers see either nothing or the whole entry.
    pub fn put(&self, key: &CacheKey, drvs: &BTreeSet<DrvPath>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let entry = CacheEntry {
            commit: key.commit.clone(),
            command: key.command.clone(),
            drvs: drvs.clone(),
        };
        let content = serde_json::to_vec_pretty(&entry)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&content)?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;

        debug!(commit = %key.commit, drvs = drvs.len(), "plan cached");
        Ok(())
    }
}
