//! Charset corruption counts on text columns

use crate::defects::encoding::looks_corrupted;
use crate::models::{Column, Dataset};
use std::collections::BTreeMap;

/// Corrupted value count for every text column, zero counts included
pub fn encoding_issues(dataset: &Dataset) -> BTreeMap<Column, usize> {
    Column::text()
        .iter()
        .map(|&column| {
            let count = dataset
                .iter()
                .filter_map(|r| r.text(column))
                .filter(|v| looks_corrupted(v))
                .count();
            (column, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defects::encoding::misdecode;
    use crate::models::tests::sample_row;

    #[test]
    fn test_counts_misdecoded_and_replacement_chars() {
        let mut rows: Vec<_> = (1..=4).map(sample_row).collect();
        rows[0].city = Some(misdecode("부산"));
        rows[1].product = Some("Ki\u{FFFD}chi".into());
        let issues = encoding_issues(&Dataset::new(rows));
        assert_eq!(issues[&Column::City], 1);
        assert_eq!(issues[&Column::Product], 1);
        assert_eq!(issues[&Column::Category], 0);
    }
}
