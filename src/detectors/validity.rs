//! Present values outside their column's allowed range

use crate::models::{Column, Dataset};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeScan {
    /// Out-of-range values per range-checked column, zero counts included
    pub by_column: BTreeMap<Column, usize>,
    /// Rows with at least one out-of-range value
    pub rows: usize,
}

pub fn find_out_of_range(dataset: &Dataset) -> RangeScan {
    let by_column = Column::range_checked()
        .iter()
        .map(|&column| {
            let count = dataset.iter().filter(|r| r.is_out_of_range(column)).count();
            (column, count)
        })
        .collect();
    let rows = dataset
        .iter()
        .filter(|r| Column::range_checked().iter().any(|c| r.is_out_of_range(*c)))
        .count();
    RangeScan { by_column, rows }
}
