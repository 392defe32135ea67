//! Disposable git worktrees for running dry runs at arbitrary commits.
//!
//! Worktrees are created in detached HEAD mode inside a temporary directory
//! and checked out commit by commit. The caller's own checkout is never
//! touched, and the worktree root is handed to the build command explicitly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nix_plan::{Checkout, NixError};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::{BisectError, Result};
use crate::git::{run_git, GitRepo};

/// A temporary worktree of a repository.
///
/// Removed by [`Worktree::close`], or on drop if it was never closed.
#[derive(Debug)]
pub struct Worktree {
    repo_dir: PathBuf,
    path: PathBuf,
    // Held for its Drop: deleting the directory after git has let go of it.
    tmp: Option<TempDir>,
}

impl Worktree {
    /// Add a detached worktree of `repo` at its current HEAD.
    pub fn create(repo: &GitRepo) -> Result<Self> {
        let tmp = tempfile::Builder::new().prefix("rebisect-").tempdir()?;
        let path = tmp.path().join("w");
        let path_str = path
            .to_str()
            .ok_or_else(|| BisectError::Worktree(format!("non UTF-8 path {path:?}")))?;

        run_git(
            repo.dir(),
            &["worktree", "add", "--detach", "--quiet", path_str, "HEAD"],
        )
        .map_err(|e| BisectError::Worktree(e.to_string()))?;
        debug!(path = %path.display(), "worktree added");

        Ok(Worktree {
            repo_dir: repo.dir().to_path_buf(),
            path,
            tmp: Some(tmp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detach the worktree at `commit`.
    pub async fn checkout_commit(&self, commit: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["checkout", "--detach", "--quiet", commit])
            .current_dir(&self.path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BisectError::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BisectError::Git(format!(
                "git checkout {commit} failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Remove the worktree and its registration, reporting failures.
    pub fn close(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        let Some(tmp) = self.tmp.take() else {
            return Ok(());
        };

        let path = self.path.to_string_lossy().to_string();
        let removed = run_git(&self.repo_dir, &["worktree", "remove", "--force", &path]);
        // Delete the directory even if git refused, then drop the stale registration.
        let deleted = tmp.close();
        let pruned = run_git(&self.repo_dir, &["worktree", "prune"]);
        debug!(path = %path, "worktree removed");

        removed.map_err(|e| BisectError::Worktree(e.to_string()))?;
        deleted?;
        pruned.map_err(|e| BisectError::Worktree(e.to_string()))?;
        Ok(())
    }
}

impl Drop for Worktree {
    // Runs git synchronously, also when dropped inside the runtime.
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(path = %self.path.display(), "failed to clean up worktree: {}", e);
        }
    }
}

#[async_trait]
impl Checkout for Worktree {
    async fn checkout(&mut self, commit: &str) -> nix_plan::Result<PathBuf> {
        self.checkout_commit(commit)
            .await
            .map_err(|e| NixError::Checkout {
                commit: commit.to_string(),
                reason: e.to_string(),
            })?;
        Ok(self.path.clone())
    }
}
