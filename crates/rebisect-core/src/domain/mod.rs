//! Domain models for rebisect.
//!
//! - `CommitId` / `ArtifactId`: canonical commit hashes and artifact identities
//! - `RebuildTable`: remaining rebuild work per commit in range
//! - `CostEntry`: ranked estimate for one candidate commit

pub mod commit;
pub mod cost;
pub mod error;
pub mod rebuild;

pub use commit::{ArtifactId, CommitId};
pub use cost::{BranchEstimate, CostEntry};
pub use error::{BisectError, Result};
pub use rebuild::{RebuildSet, RebuildTable};
