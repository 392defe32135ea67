//! rebisect - pick the cheapest next commit to test during `git bisect`
//!
//! Run inside a repository with a bisect in progress:
//!
//! ```text
//! rebisect --jobs 4 -- nix-build -A hello
//! ```
//!
//! Every commit between the good and bad boundaries is dry-run built in a
//! scratch worktree, and candidates are ranked by how much they are expected
//! to cost to build, counting the follow-up step as well.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rebisect_core::{
    collect_rebuild_table, estimate, render_json, render_table, GitRepo, PlanConfig,
    RangeResolver, RebuildOracle, Worktree,
};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "rebisect")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rank bisect candidates by expected Nix rebuild cost", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Check out the cheapest commit when done
    #[arg(long)]
    checkout: bool,

    /// Number of candidates to print
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Parallel worktrees used to run the build command
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Output format for the ranking
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Repository with a bisect in progress
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Directory for memoized dry-run results
    #[arg(long, env = "REBISECT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Nix store the `.drv` paths live in
    #[arg(long, env = "NIX_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Flag appended to the build command to make it a dry run
    #[arg(long, allow_hyphen_values = true)]
    dry_run_flag: Option<String>,

    /// Build command, e.g. `nix-build -A hello`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

impl Cli {
    fn plan_config(&self) -> PlanConfig {
        let mut config = PlanConfig::from_env();
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(dir) = &self.store_dir {
            config = config.with_store_dir(dir);
        }
        if let Some(flag) = &self.dry_run_flag {
            config = config.with_dry_run_flag(flag);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rebisect_core::init_tracing(cli.json_logs, level);

    if cli.command.is_empty() {
        bail!("no command given");
    }

    let output = run(&cli).await?;
    print!("{output}");
    Ok(())
}

/// Rank the current bisect range and return the rendered report.
async fn run(cli: &Cli) -> Result<String> {
    let repo = GitRepo::open(&cli.repo)
        .with_context(|| format!("{} is not a git repository", cli.repo.display()))?;
    let refs = repo
        .bisect_refs()
        .context("Failed to read bisect state")?;

    let range = repo
        .range(&refs.bad, &refs.goods)
        .context("Failed to list commits between good and bad")?;
    if range.is_empty() {
        bail!("no commits left between good and bad; the bisect is finished");
    }
    info!("found {} commits", range.len());

    let config = cli.plan_config();
    info!(
        cache = %config.cache_dir.display(),
        store = %config.store_dir.display(),
        "Collecting rebuild sets"
    );
    let oracle = RebuildOracle::from_config(&config);
    let table = collect_rebuild_table(&range, &cli.command, &oracle, cli.jobs, || {
        Worktree::create(&repo)
    })
    .await
    .context("Failed to compute rebuild sets")?;

    let ranked = estimate(&range, &table, &refs.goods, &refs.bad, &repo)?;

    let output = match cli.format {
        Format::Table => render_table(&ranked, cli.top),
        Format::Json => render_json(range.len(), &ranked, cli.top)?,
    };

    if cli.checkout {
        if let Some(best) = ranked.first() {
            repo.checkout(&best.commit)
                .with_context(|| format!("Failed to check out {}", best.commit))?;
        }
    }

    Ok(output)
}
