//! nix-plan: rebuild planning for Nix builds
//!
//! Answers "which derivations would this build command still have to build
//! at this commit?" by running the command with `--dry-run` in a checkout,
//! scraping `.drv` paths from its stderr and dropping the ones whose
//! outputs are already in the local store.
//!
//! Raw dry-run results are memoized on disk per (commit, command); the
//! built-derivation filter is always reapplied.

pub mod cache;
pub mod config;
pub mod drv;
pub mod error;
pub mod oracle;
pub mod planner;

pub use cache::{CacheEntry, CacheKey, PlanCache};
pub use config::PlanConfig;
pub use drv::{DrvPath, DrvPattern, LocalStore, StoreQuery};
pub use error::NixError;
pub use oracle::{Checkout, RebuildOracle};
pub use planner::{CommandPlanner, DryRunPlanner};

/// Result type for nix-plan operations
pub type Result<T> = std::result::Result<T, NixError>;
