//! Full-row duplicate grouping

use crate::models::Dataset;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateStats {
    /// Rows beyond the first in each group
    pub duplicate_rows: usize,
    /// Groups with more than one member
    pub groups: usize,
}

pub fn find_duplicates(dataset: &Dataset) -> DuplicateStats {
    let mut counts: FxHashMap<_, usize> = FxHashMap::default();
    for row in dataset {
        *counts.entry(row.row_key()).or_insert(0) += 1;
    }
    counts
        .values()
        .filter(|&&n| n > 1)
        .fold(DuplicateStats::default(), |acc, &n| DuplicateStats {
            duplicate_rows: acc.duplicate_rows + n - 1,
            groups: acc.groups + 1,
        })
}
