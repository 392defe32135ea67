//! Rebuild-set oracle: cached dry runs filtered by local build status.

use crate::cache::{CacheKey, PlanCache};
use crate::config::PlanConfig;
use crate::drv::{DrvPath, DrvPattern, LocalStore, StoreQuery};
use crate::planner::{CommandPlanner, DryRunPlanner};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

/// A working copy that can be moved to an arbitrary commit.
#[async_trait]
pub trait Checkout: Send {
    /// Check out `commit` and return the root the build command runs in.
    async fn checkout(&mut self, commit: &str) -> Result<PathBuf>;
}

/// Computes the derivations a command still has to build at a commit
pub struct RebuildOracle<P = CommandPlanner, S = LocalStore> {
    planner: P,
    store: S,
    cache: PlanCache,
    pattern: DrvPattern,
}

impl RebuildOracle {
    /// Oracle backed by real processes and the local Nix store
    pub fn from_config(config: &PlanConfig) -> Self {
        Self::new(
            CommandPlanner::new(&config.dry_run_flag),
            LocalStore::new(&config.store_dir),
            PlanCache::new(&config.cache_dir),
            DrvPattern::new(&config.store_dir),
        )
    }
}

impl<P: DryRunPlanner, S: StoreQuery> RebuildOracle<P, S> {
    pub fn new(planner: P, store: S, cache: PlanCache, pattern: DrvPattern) -> Self {
        RebuildOracle {
            planner,
            store,
            cache,
            pattern,
        }
    }

    pub fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Every derivation the dry run reports at `commit`, built or not.
    ///
    /// Served from the cache when possible; otherwise `checkout` is moved to
    /// `commit` and the command is run there. Failed runs are not cached.
    pub async fn planned<C>(
        &self,
        commit: &str,
        command: &[String],
        checkout: &mut C,
    ) -> Result<BTreeSet<DrvPath>>
    where
        C: Checkout + ?Sized,
    {
        let key = CacheKey::new(commit, command);
        if let Some(drvs) = self.cache.get(&key)? {
            return Ok(drvs);
        }

        let root = checkout.checkout(commit).await?;
        let stderr = self.planner.dry_run(&root, command).await?;
        let drvs = self.pattern.extract(&stderr);
        self.cache.put(&key, &drvs)?;
        Ok(drvs)
    }

    /// Derivations still to be built at `commit`.
    pub async fn rebuild_set<C>(
        &self,
        commit: &str,
        command: &[String],
        checkout: &mut C,
    ) -> Result<BTreeSet<DrvPath>>
    where
        C: Checkout + ?Sized,
    {
        let planned = self.planned(commit, command, checkout).await?;
        let remaining = self.unbuilt(planned)?;
        debug!(commit, remaining = remaining.len(), "rebuild set");
        Ok(remaining)
    }

    /// Drop derivations whose outputs are already present.
    ///
    /// Build status changes between runs, so this is never cached.
    pub fn unbuilt(&self, drvs: BTreeSet<DrvPath>) -> Result<BTreeSet<DrvPath>> {
        let mut remaining = BTreeSet::new();
        for drv in drvs {
            if !self.store.is_built(&drv)? {
                remaining.insert(drv);
            }
        }
        Ok(remaining)
    }
}
