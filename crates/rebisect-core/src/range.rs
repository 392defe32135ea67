//! Bisection range queries.

use crate::domain::{CommitId, Result};

/// Lists the commits still to be searched between a bad boundary and a set
/// of good ones.
///
/// Implementations return every ancestor of `bad` that is not an ancestor of
/// any element of `goods`, excluding `bad` itself. Order is not significant
/// but must be stable for fixed inputs. Queries must not touch any refs, so
/// the estimator can ask about hypothetical boundaries freely.
pub trait RangeResolver {
    fn range(&self, bad: &CommitId, goods: &[CommitId]) -> Result<Vec<CommitId>>;
}

impl<R: RangeResolver + ?Sized> RangeResolver for &R {
    fn range(&self, bad: &CommitId, goods: &[CommitId]) -> Result<Vec<CommitId>> {
        (**self).range(bad, goods)
    }
}
