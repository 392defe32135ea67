//! Rendering ranked estimates for the terminal or for scripts.

use serde::{Deserialize, Serialize};

use crate::domain::{CostEntry, Result};

/// Column headers, in print order. `>` is the branch left if the commit is
/// good, `<` the branch left if it is bad.
pub const COLUMNS: [&str; 7] = [
    "commit",
    "estimated cost",
    "rebuilds",
    "commits>",
    "rebuilds>",
    "commits<",
    "rebuilds<",
];

/// Ranked estimates as emitted with `--format json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Commits in the search range.
    pub candidates: usize,
    /// Best first, truncated to the requested number of rows.
    pub entries: Vec<CostEntry>,
}

impl RankingReport {
    pub fn new(candidates: usize, ranked: &[CostEntry], top: usize) -> Self {
        RankingReport {
            candidates,
            entries: ranked.iter().take(top).cloned().collect(),
        }
    }
}

/// Tab-separated table of the first `top` entries.
pub fn render_table(ranked: &[CostEntry], top: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<48}", COLUMNS[0]));
    for column in &COLUMNS[1..] {
        out.push('\t');
        out.push_str(column);
    }
    out.push('\n');

    for entry in ranked.iter().take(top) {
        let row = [
            entry.commit.to_string(),
            // Whole derivations; the fractional part is noise.
            (entry.cost.trunc() as u64).to_string(),
            entry.own_rebuilds.to_string(),
            entry.if_good.candidates.to_string(),
            entry.if_good.rebuilds.to_string(),
            entry.if_bad.candidates.to_string(),
            entry.if_bad.rebuilds.to_string(),
        ];
        out.push_str(&row.join("\t\t"));
        out.push('\n');
    }
    out
}

/// Pretty JSON for the first `top` entries.
pub fn render_json(candidates: usize, ranked: &[CostEntry], top: usize) -> Result<String> {
    let report = RankingReport::new(candidates, ranked, top);
    Ok(serde_json::to_string_pretty(&report)?)
}
