//! IQR fence outliers on numeric columns
//!
//! Bounds are `[Q1 - 3·IQR, Q3 + 3·IQR]` with linear-interpolation quartiles
//! over the non-null values of each column.

use super::missing::percent;
use crate::models::{Column, Dataset};
use crate::stats::IqrBounds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierStat {
    pub count: usize,
    pub pct: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierScan {
    /// Only columns with at least one value
    pub by_column: BTreeMap<Column, OutlierStat>,
    /// Union of flagged row indices across columns
    pub rows: BTreeSet<usize>,
}

pub fn find_outliers(dataset: &Dataset) -> OutlierScan {
    let mut scan = OutlierScan::default();
    for &column in Column::numeric() {
        let values = dataset.numeric_values(column);
        let Some(bounds) = IqrBounds::from_values(&values) else {
            continue;
        };

        let mut count = 0;
        for (i, row) in dataset.iter().enumerate() {
            if let Some(v) = row.numeric(column) {
                if !bounds.contains(v) {
                    count += 1;
                    scan.rows.insert(i);
                }
            }
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        scan.by_column.insert(
            column,
            OutlierStat {
                count,
                pct: percent(count, dataset.len()),
                lower_bound: bounds.lower,
                upper_bound: bounds.upper,
                min,
                max,
            },
        );
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_row;

    fn with_amounts(amounts: &[Option<f64>]) -> Dataset {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut row = sample_row(i as u64 + 1);
                row.amount = *a;
                row
            })
            .collect()
    }

    #[test]
    fn test_flags_only_extreme_values() {
        let mut amounts: Vec<Option<f64>> = (1..=100).map(|v| Some(v as f64 * 100.0)).collect();
        amounts.push(Some(1_000_000.0));
        amounts.push(None);
        let scan = find_outliers(&with_amounts(&amounts));

        let stat = scan.by_column[&Column::Amount];
        assert_eq!(stat.count, 1);
        assert_eq!(scan.rows.iter().copied().collect::<Vec<_>>(), vec![100]);
        assert_eq!(stat.max, 1_000_000.0);
        assert_eq!(stat.min, 100.0);
        assert!(stat.upper_bound < 1_000_000.0);
    }

    #[test]
    fn test_all_null_column_is_skipped() {
        let scan = find_outliers(&with_amounts(&[None, None]));
        assert!(scan.by_column.is_empty());
        assert!(scan.rows.is_empty());
    }
}
