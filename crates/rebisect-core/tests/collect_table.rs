use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nix_plan::drv::DrvPattern;
use rebisect_core::{
    collect_rebuild_table, estimate, ArtifactId, BisectError, Checkout, CommitId, DrvPath,
    DryRunPlanner, InMemoryHistory, NixError, PlanCache, RangeResolver, RebuildOracle,
    StoreQuery,
};
use tempfile::TempDir;

const STORE: &str = "/nix/store";

fn drv(name: &str) -> String {
    format!("{STORE}/{name}.drv")
}

/// Prints a canned dry-run report for the commit named by the workdir.
struct ScriptedPlanner {
    reports: BTreeMap<String, Vec<String>>,
    fail_on: Option<String>,
    runs: Arc<AtomicUsize>,
}

impl ScriptedPlanner {
    fn new(reports: &[(&str, &[&str])]) -> Self {
        ScriptedPlanner {
            reports: reports
                .iter()
                .map(|(commit, drvs)| (commit.to_string(), drvs.iter().map(|d| drv(d)).collect()))
                .collect(),
            fail_on: None,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl DryRunPlanner for ScriptedPlanner {
    async fn dry_run(&self, workdir: &Path, command: &[String]) -> nix_plan::Result<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let commit = workdir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        if self.fail_on.as_deref() == Some(commit.as_str()) {
            return Err(NixError::CommandFailed {
                command: command.join(" "),
                status: "exit status: 1".to_string(),
                stderr: "error: attribute missing".to_string(),
            });
        }
        let drvs = self.reports.get(&commit).cloned().unwrap_or_default();
        Ok(format!(
            "these {} derivations will be built:\n  {}\n",
            drvs.len(),
            drvs.join("\n  ")
        ))
    }
}

struct BuiltSet(BTreeSet<String>);

impl StoreQuery for BuiltSet {
    fn is_built(&self, drv: &DrvPath) -> nix_plan::Result<bool> {
        Ok(self.0.contains(drv.as_str()))
    }
}

/// Pretends to be a worktree whose directory is named after the commit.
struct FakeCheckout;

#[async_trait]
impl Checkout for FakeCheckout {
    async fn checkout(&mut self, commit: &str) -> nix_plan::Result<PathBuf> {
        Ok(PathBuf::from("/worktrees").join(commit))
    }
}

fn oracle(
    planner: ScriptedPlanner,
    built: &[&str],
    cache: &TempDir,
) -> RebuildOracle<ScriptedPlanner, BuiltSet> {
    RebuildOracle::new(
        planner,
        BuiltSet(built.iter().map(|d| drv(d)).collect()),
        PlanCache::new(cache.path()),
        DrvPattern::new(Path::new(STORE)),
    )
}

fn command() -> Vec<String> {
    vec!["nix".into(), "build".into(), ".#default".into()]
}

fn commits(ids: &[&str]) -> Vec<CommitId> {
    ids.iter().map(|id| CommitId::new(*id)).collect()
}

fn artifacts(names: &[&str]) -> BTreeSet<ArtifactId> {
    names.iter().map(|n| ArtifactId::new(drv(n))).collect()
}

fn reports() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        ("a", &["aaa-x"][..]),
        ("b", &["aaa-x", "bbb-y"][..]),
        ("c", &["aaa-x", "bbb-y", "ccc-z", "ddd-w"][..]),
    ]
}

#[tokio::test]
async fn every_commit_gets_its_unbuilt_set() {
    let cache = TempDir::new().unwrap();
    let oracle = oracle(ScriptedPlanner::new(&reports()), &["ddd-w"], &cache);
    let opened = AtomicUsize::new(0);

    let table = collect_rebuild_table(&commits(&["a", "b", "c"]), &command(), &oracle, 2, || {
        opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeCheckout)
    })
    .await
    .unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.get(&CommitId::new("a")), Some(&artifacts(&["aaa-x"])));
    assert_eq!(
        table.get(&CommitId::new("c")),
        Some(&artifacts(&["aaa-x", "bbb-y", "ccc-z"]))
    );
    assert_eq!(opened.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cached_commits_never_open_a_checkout() {
    let cache = TempDir::new().unwrap();
    let range = commits(&["a", "b", "c"]);

    let first = oracle(ScriptedPlanner::new(&reports()), &[], &cache);
    let warm = collect_rebuild_table(&range, &command(), &first, 1, || Ok(FakeCheckout))
        .await
        .unwrap();

    let second_planner = ScriptedPlanner::new(&[]);
    let runs = second_planner.runs.clone();
    let second = oracle(second_planner, &["aaa-x"], &cache);
    let opened = AtomicUsize::new(0);
    let table = collect_rebuild_table(&range, &command(), &second, 3, || {
        opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeCheckout)
    })
    .await
    .unwrap();

    assert_eq!(opened.load(Ordering::SeqCst), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    // Build status is re-read even when the plan comes from the cache.
    assert_eq!(warm.get(&CommitId::new("a")), Some(&artifacts(&["aaa-x"])));
    assert!(table.get(&CommitId::new("a")).unwrap().is_empty());
}

#[tokio::test]
async fn failing_command_aborts_the_run() {
    let cache = TempDir::new().unwrap();
    let mut planner = ScriptedPlanner::new(&reports());
    planner.fail_on = Some("b".to_string());
    let oracle = oracle(planner, &[], &cache);

    let err = collect_rebuild_table(&commits(&["a", "b", "c"]), &command(), &oracle, 1, || {
        Ok(FakeCheckout)
    })
    .await
    .unwrap_err();

    match err {
        BisectError::RebuildSet { commit, source } => {
            assert_eq!(commit, CommitId::new("b"));
            assert!(matches!(source, NixError::CommandFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing is cached for the failed commit.
    let key = nix_plan::CacheKey::new("b", &command());
    assert!(!oracle.cache().entry_path(&key).exists());
}

#[tokio::test]
async fn checkout_failure_is_reported_per_commit() {
    let cache = TempDir::new().unwrap();
    let oracle = oracle(ScriptedPlanner::new(&reports()), &[], &cache);

    let err = collect_rebuild_table(&commits(&["a"]), &command(), &oracle, 1, || {
        Err::<FakeCheckout, _>(BisectError::Worktree("disk full".to_string()))
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BisectError::RebuildSet {
            source: NixError::Checkout { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn collected_table_feeds_the_estimator() {
    let history = InMemoryHistory::linear(&["root", "a", "b", "c", "bad"]);
    let goods = commits(&["root"]);
    let bad = CommitId::new("bad");
    let range = history.range(&bad, &goods).unwrap();

    let cache = TempDir::new().unwrap();
    let oracle = oracle(ScriptedPlanner::new(&reports()), &[], &cache);
    let table = collect_rebuild_table(&range, &command(), &oracle, 4, || Ok(FakeCheckout))
        .await
        .unwrap();

    let ranked = estimate(&range, &table, &goods, &bad, &history).unwrap();
    let order: Vec<&str> = ranked.iter().map(|e| e.commit.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
    assert_eq!(ranked[1].cost, 3.0);
}
