//! Configuration for the rebuild planner
//!
//! Values come from the environment by default and can be overridden
//! with the `with_*` builders (the CLI maps its flags onto them).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory name used under the user cache directory
pub const CACHE_SUBDIR: &str = "rebisect";

/// Default Nix store location
pub const DEFAULT_STORE_DIR: &str = "/nix/store";

/// Flag appended to the build command to request a plan instead of a build
pub const DEFAULT_DRY_RUN_FLAG: &str = "--dry-run";

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Directory holding one file per cached plan
    pub cache_dir: PathBuf,
    /// Nix store directory, used to recognise derivation paths
    pub store_dir: PathBuf,
    /// Flag that turns the build command into a dry run
    pub dry_run_flag: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            cache_dir: std::env::var_os("REBISECT_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    default_cache_root(
                        std::env::var_os("XDG_CACHE_HOME").map(PathBuf::from),
                        std::env::var_os("HOME").map(PathBuf::from),
                    )
                    .join(CACHE_SUBDIR)
                }),
            store_dir: std::env::var_os("NIX_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            dry_run_flag: DEFAULT_DRY_RUN_FLAG.to_string(),
        }
    }
}

impl PlanConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Override the cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Override the store directory
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// Override the dry-run flag
    pub fn with_dry_run_flag(mut self, flag: &str) -> Self {
        self.dry_run_flag = flag.to_string();
        self
    }
}

/// `$XDG_CACHE_HOME`, else `$HOME/.cache`, else `./.cache`.
fn default_cache_root(xdg_cache_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    match (xdg_cache_home, home) {
        (Some(xdg), _) if !xdg.as_os_str().is_empty() => xdg,
        (_, Some(home)) => home.join(".cache"),
        _ => PathBuf::from(".cache"),
    }
}
