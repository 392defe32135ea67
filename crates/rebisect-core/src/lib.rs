//! rebisect core library
//!
//! Picks the next commit to test in a `git bisect` by expected rebuild cost
//! instead of by the number of remaining steps. The estimator is pure; git,
//! worktrees and the Nix planner are plugged in around it.

pub mod collect;
pub mod domain;
pub mod estimator;
pub mod fakes;
pub mod git;
pub mod range;
pub mod report;
pub mod telemetry;
pub mod worktree;

pub use collect::collect_rebuild_table;
pub use domain::{
    ArtifactId, BisectError, BranchEstimate, CommitId, CostEntry, RebuildSet, RebuildTable,
    Result,
};
pub use estimator::{estimate, rank};
pub use fakes::InMemoryHistory;
pub use git::{BisectRefs, GitRepo, BISECT_BAD_REF, BISECT_GOOD_REFS};
pub use range::RangeResolver;
pub use report::{render_json, render_table, RankingReport};
pub use telemetry::init_tracing;
pub use worktree::Worktree;

pub use nix_plan::{
    CacheKey, Checkout, CommandPlanner, DrvPath, DryRunPlanner, LocalStore, NixError, PlanCache,
    PlanConfig, RebuildOracle, StoreQuery,
};

/// rebisect version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
