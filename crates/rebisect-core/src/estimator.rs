//! Expected-rebuild-cost estimation.
//!
//! For a candidate `C` in a range of `n` commits:
//!
//! ```text
//! cost(C) = |R(C)| + (|G| * |⋃R(G) \ R(C)| + |B| * |⋃R(B) \ R(C)|) / n
//! ```
//!
//! where `R` is the rebuild table, `G` the range left if `C` is good
//! (`range(bad, goods ∪ {C})`) and `B` the range left if `C` is bad
//! (`range(C, goods)`). The first term is the certain cost of testing `C`;
//! the second weighs the extra work each outcome could still demand.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::{BisectError, BranchEstimate, CommitId, CostEntry, RebuildTable, Result};
use crate::range::RangeResolver;

/// Estimate the cost of every commit in `range`, cheapest first.
///
/// `range` is treated as a set. Fails with `EmptyRange` or
/// `MissingRebuildSet` before any estimate is computed; resolver errors are
/// returned unchanged.
pub fn estimate<R>(
    range: &[CommitId],
    table: &RebuildTable,
    goods: &[CommitId],
    bad: &CommitId,
    resolver: &R,
) -> Result<Vec<CostEntry>>
where
    R: RangeResolver + ?Sized,
{
    let candidates: BTreeSet<&CommitId> = range.iter().collect();
    if candidates.is_empty() {
        return Err(BisectError::EmptyRange);
    }
    for commit in &candidates {
        table.require(commit)?;
    }

    let n = candidates.len();
    let mut entries = candidates
        .into_iter()
        .map(|commit| estimate_one(commit, n, table, goods, bad, resolver))
        .collect::<Result<Vec<_>>>()?;

    rank(&mut entries);
    Ok(entries)
}

fn estimate_one<R>(
    commit: &CommitId,
    n: usize,
    table: &RebuildTable,
    goods: &[CommitId],
    bad: &CommitId,
    resolver: &R,
) -> Result<CostEntry>
where
    R: RangeResolver + ?Sized,
{
    let own = table.require(commit)?;

    let mut goods_with_commit = goods.to_vec();
    goods_with_commit.push(commit.clone());
    let if_good = resolver.range(bad, &goods_with_commit)?;
    let if_bad = resolver.range(commit, goods)?;

    let if_good = BranchEstimate {
        candidates: if_good.len(),
        rebuilds: table.union_size_excluding(&if_good, own)?,
    };
    let if_bad = BranchEstimate {
        candidates: if_bad.len(),
        rebuilds: table.union_size_excluding(&if_bad, own)?,
    };

    let expectation = (if_good.candidates * if_good.rebuilds
        + if_bad.candidates * if_bad.rebuilds) as f64
        / n as f64;
    let cost = own.len() as f64 + expectation;

    debug!(
        commit = commit.short(),
        cost,
        own = own.len(),
        good_candidates = if_good.candidates,
        good_rebuilds = if_good.rebuilds,
        bad_candidates = if_bad.candidates,
        bad_rebuilds = if_bad.rebuilds,
        "estimated"
    );

    Ok(CostEntry {
        commit: commit.clone(),
        cost,
        own_rebuilds: own.len(),
        if_good,
        if_bad,
    })
}

/// Ascending cost; equal costs by commit id.
pub fn rank(entries: &mut [CostEntry]) {
    entries.sort_by(compare);
}

fn compare(a: &CostEntry, b: &CostEntry) -> Ordering {
    a.cost
        .total_cmp(&b.cost)
        .then_with(|| a.commit.cmp(&b.commit))
}
