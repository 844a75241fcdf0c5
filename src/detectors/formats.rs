//! Date format histograms

use crate::dates::{classify, DateFormat};
use crate::models::{Column, Dataset};
use std::collections::BTreeMap;

pub type FormatHistogram = BTreeMap<DateFormat, usize>;

/// Bucket counts for each date-like column. Missing values are not bucketed.
pub fn format_variants(dataset: &Dataset) -> BTreeMap<Column, FormatHistogram> {
    Column::date_like()
        .iter()
        .map(|&column| {
            let mut histogram = FormatHistogram::new();
            for value in dataset.iter().filter_map(|r| r.text(column)) {
                if value.trim().is_empty() {
                    continue;
                }
                *histogram.entry(classify(value)).or_insert(0) += 1;
            }
            (column, histogram)
        })
        .collect()
}

/// More than one non-empty bucket in any column
pub fn is_inconsistent(variants: &BTreeMap<Column, FormatHistogram>) -> bool {
    variants
        .values()
        .any(|h| h.values().filter(|&&n| n > 0).count() > 1)
}
