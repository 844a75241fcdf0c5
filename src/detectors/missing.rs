//! Null and blank cell counts

use crate::models::{Column, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingStat {
    pub count: usize,
    /// Percentage of rows, 0-100
    pub pct: f64,
}

/// Per-column missing counts for every schema column, zero counts included
pub fn missing_by_column(dataset: &Dataset) -> BTreeMap<Column, MissingStat> {
    let rows = dataset.len();
    Column::all()
        .iter()
        .map(|&column| {
            let count = dataset.iter().filter(|r| r.is_missing(column)).count();
            (
                column,
                MissingStat {
                    count,
                    pct: percent(count, rows),
                },
            )
        })
        .collect()
}

pub(crate) fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_row;

    #[test]
    fn test_counts_nulls_and_blanks() {
        let mut rows: Vec<_> = (1..=4).map(sample_row).collect();
        rows[0].amount = None;
        rows[1].city = Some(String::new());
        rows[2].amount = None;
        let stats = missing_by_column(&Dataset::new(rows));

        assert_eq!(stats[&Column::Amount].count, 2);
        assert!((stats[&Column::Amount].pct - 50.0).abs() < 1e-9);
        assert_eq!(stats[&Column::City].count, 1);
        assert_eq!(stats[&Column::Id].count, 0);
        assert_eq!(stats.len(), Column::all().len());
    }

    #[test]
    fn test_empty_dataset_has_zero_pct() {
        let stats = missing_by_column(&Dataset::default());
        assert!(stats.values().all(|s| s.count == 0 && s.pct == 0.0));
    }
}
