//! Git integration: revision parsing, bisection state and range queries.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::domain::{BisectError, CommitId, Result};
use crate::range::RangeResolver;

/// Ref git bisect moves to the current bad commit.
pub const BISECT_BAD_REF: &str = "refs/bisect/bad";

/// Pattern matching every good commit git bisect has recorded.
pub const BISECT_GOOD_REFS: &str = "refs/bisect/good-*";

/// Boundaries of the bisection currently in progress, canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectRefs {
    pub bad: CommitId,
    pub goods: Vec<CommitId>,
}

/// A git repository driven through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let repo = GitRepo { dir: dir.into() };
        repo.git(&["rev-parse", "--git-dir"])?;
        Ok(repo)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run git in the repository and return trimmed stdout.
    pub(crate) fn git(&self, args: &[&str]) -> Result<String> {
        run_git(&self.dir, args)
    }

    /// Canonicalize `rev` to a full commit hash.
    pub fn rev_parse(&self, rev: &str) -> Result<CommitId> {
        let rev_spec = format!("{rev}^{{commit}}");
        let sha = self
            .git(&["rev-parse", "--verify", "--quiet", &rev_spec])
            .map_err(|e| BisectError::UnknownRevision {
                rev: rev.to_string(),
                reason: e.to_string(),
            })?;
        if sha.is_empty() {
            return Err(BisectError::UnknownRevision {
                rev: rev.to_string(),
                reason: "git rev-parse returned empty output".to_string(),
            });
        }
        Ok(CommitId::new(sha))
    }

    /// Refs matching `pattern`, as full ref names.
    pub fn refs_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let out = self.git(&["for-each-ref", "--format=%(refname)", pattern])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Read the bad and good boundaries recorded by `git bisect`.
    pub fn bisect_refs(&self) -> Result<BisectRefs> {
        let bad = self
            .rev_parse(BISECT_BAD_REF)
            .map_err(|_| BisectError::NoBisectInProgress)?;

        let goods = self
            .refs_matching(BISECT_GOOD_REFS)?
            .iter()
            .map(|r| self.rev_parse(r))
            .collect::<Result<Vec<_>>>()?;
        if goods.is_empty() {
            return Err(BisectError::NoGoodCommits);
        }

        debug!(bad = bad.short(), goods = goods.len(), "bisect refs");
        Ok(BisectRefs { bad, goods })
    }

    /// Check out `commit` in this repository's working tree.
    pub fn checkout(&self, commit: &CommitId) -> Result<()> {
        info!("Checking out {}", commit);
        self.git(&["checkout", "--detach", "--quiet", commit.as_str()])?;
        Ok(())
    }
}

// Blocking: only call from the task driving the run, never from a spawned
// runtime worker that other work depends on.
impl RangeResolver for GitRepo {
    /// `git rev-list <bad> --not <goods...>`, minus `bad`.
    fn range(&self, bad: &CommitId, goods: &[CommitId]) -> Result<Vec<CommitId>> {
        let mut args = vec!["rev-list", bad.as_str(), "--not"];
        args.extend(goods.iter().map(CommitId::as_str));
        let out = self.git(&args)?;

        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != bad.as_str())
            .map(CommitId::new)
            .collect())
    }
}

/// Run git in `dir`, failing on a non-zero exit.
pub(crate) fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| BisectError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BisectError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
