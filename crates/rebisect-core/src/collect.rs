//! Building the rebuild table for a search range.
//!
//! Commits are dealt round-robin into `jobs` lanes. Each lane owns one
//! checkout, opened on the first cache miss, and visits its commits one at a
//! time; lanes run concurrently. The first failure aborts every lane, and
//! dropping a lane drops its checkout.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::try_join_all;
use nix_plan::{Checkout, DryRunPlanner, NixError, RebuildOracle, StoreQuery};
use tracing::info;

use crate::domain::{ArtifactId, BisectError, CommitId, RebuildSet, RebuildTable, Result};

/// Compute the rebuild set of every commit in `commits`.
///
/// `open_checkout` is called at most once per lane, and only when a lane
/// actually has to run the build command.
pub async fn collect_rebuild_table<P, S, C, F>(
    commits: &[CommitId],
    command: &[String],
    oracle: &RebuildOracle<P, S>,
    jobs: usize,
    open_checkout: F,
) -> Result<RebuildTable>
where
    P: DryRunPlanner,
    S: StoreQuery,
    C: Checkout,
    F: Fn() -> Result<C> + Sync,
{
    let lanes = split_lanes(commits, jobs);
    let total = commits.len();
    let done = AtomicUsize::new(0);
    let open = &open_checkout;
    let done = &done;

    let results = try_join_all(lanes.into_iter().map(|lane| async move {
        let mut checkout = LazyCheckout { open, inner: None };
        let mut sets = Vec::with_capacity(lane.len());
        for commit in lane {
            let drvs = oracle
                .rebuild_set(commit.as_str(), command, &mut checkout)
                .await
                .map_err(|source| BisectError::RebuildSet {
                    commit: commit.clone(),
                    source,
                })?;
            let set: RebuildSet = drvs.into_iter().map(ArtifactId::from).collect();

            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            info!("[{}/{}] {} needs {} rebuilds", n, total, commit, set.len());
            sets.push((commit, set));
        }
        Ok::<_, BisectError>(sets)
    }))
    .await?;

    Ok(results.into_iter().flatten().collect())
}

/// Deal `commits` round-robin into at most `jobs` non-empty lanes.
fn split_lanes(commits: &[CommitId], jobs: usize) -> Vec<Vec<CommitId>> {
    let jobs = jobs.clamp(1, commits.len().max(1));
    let mut lanes = vec![Vec::new(); jobs];
    for (i, commit) in commits.iter().enumerate() {
        lanes[i % jobs].push(commit.clone());
    }
    lanes.retain(|lane| !lane.is_empty());
    lanes
}

/// Opens the underlying checkout on first use.
struct LazyCheckout<'f, C, F> {
    open: &'f F,
    inner: Option<C>,
}

#[async_trait]
impl<'f, C, F> Checkout for LazyCheckout<'f, C, F>
where
    C: Checkout,
    F: Fn() -> Result<C> + Sync,
{
    async fn checkout(&mut self, commit: &str) -> nix_plan::Result<PathBuf> {
        if self.inner.is_none() {
            let opened = (self.open)().map_err(|e| NixError::Checkout {
                commit: commit.to_string(),
                reason: e.to_string(),
            })?;
            self.inner = Some(opened);
        }
        let inner = self.inner.as_mut().ok_or_else(|| NixError::Checkout {
            commit: commit.to_string(),
            reason: "no checkout available".to_string(),
        })?;
        inner.checkout(commit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commits(n: usize) -> Vec<CommitId> {
        (0..n).map(|i| CommitId::new(format!("c{i}"))).collect()
    }

    #[test]
    fn lanes_cover_every_commit_once() {
        let lanes = split_lanes(&commits(7), 3);
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 2, 2]);
        let mut all: Vec<_> = lanes.into_iter().flatten().collect();
        all.sort();
        let mut want = commits(7);
        want.sort();
        assert_eq!(all, want);
    }

    #[test]
    fn never_more_lanes_than_commits() {
        assert_eq!(split_lanes(&commits(2), 8).len(), 2);
        assert_eq!(split_lanes(&commits(5), 0).len(), 1);
        assert!(split_lanes(&[], 4).is_empty());
    }
}
