//! Quality cleaner
//!
//! Ordered passes; each sees the output of the one before:
//!
//! 1. drop rows missing the critical column, then rows holding an
//!    out-of-range tier or amount
//! 2. impute numeric nulls with the category median
//! 3. impute categorical nulls with the category mode
//! 4. drop exact duplicates, keeping the first
//! 5. cap numeric values at the IQR fence
//! 6. rewrite dates canonically, dropping unparseable ones
//! 7. reverse charset mis-decodes
//!
//! When passes 6 or 7 changed anything, deduplication and capping run once
//! more so the final rows are unique and inside their recomputed fences.

mod log;
mod passes;

pub use log::{CleaningAction, CleaningLog, CleaningLogEntry};

use crate::config::CleaningConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Column, Dataset};
use tracing::info;

const STAGE: &str = "clean";

#[derive(Debug, Clone)]
pub struct QualityCleaner {
    critical_column: String,
}

impl Default for QualityCleaner {
    fn default() -> Self {
        Self::new(&CleaningConfig::default())
    }
}

impl QualityCleaner {
    pub fn new(config: &CleaningConfig) -> Self {
        Self {
            critical_column: config.critical_column.clone(),
        }
    }

    pub fn with_critical_column(mut self, column: impl Into<String>) -> Self {
        self.critical_column = column.into();
        self
    }

    /// Run every pass over a copy of `dataset`.
    ///
    /// Fails only when the critical column is not part of the schema.
    pub fn clean(&self, dataset: &Dataset) -> PipelineResult<(Dataset, CleaningLog)> {
        let critical = Column::from_name(&self.critical_column)
            .ok_or_else(|| PipelineError::schema(STAGE, self.critical_column.as_str()))?;

        let mut rows = dataset.rows().to_vec();
        let mut log = CleaningLog::new();

        passes::drop_missing_critical(&mut rows, critical, &mut log);
        passes::drop_out_of_range(&mut rows, &mut log);
        passes::impute_numeric(&mut rows, &mut log);
        passes::impute_categorical(&mut rows, &mut log);
        passes::deduplicate(&mut rows, &mut log);
        passes::cap_outliers(&mut rows, &mut log);
        let dropped = passes::standardize_formats(&mut rows, &mut log);
        let repaired = passes::repair_encoding(&mut rows, &mut log);

        if dropped > 0 || repaired > 0 {
            passes::deduplicate(&mut rows, &mut log);
            passes::cap_outliers(&mut rows, &mut log);
        }

        info!(
            "Cleaned {} rows into {} ({} log entries)",
            dataset.len(),
            rows.len(),
            log.len()
        );
        Ok((Dataset::new(rows), log))
    }
}

/// Clean with the default critical column
pub fn clean(dataset: &Dataset) -> PipelineResult<(Dataset, CleaningLog)> {
    QualityCleaner::default().clean(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defects::encoding::misdecode;
    use crate::models::tests::sample_row;

    fn messy() -> Dataset {
        let mut rows: Vec<_> = (1..=40)
            .map(|id| {
                let mut r = sample_row(id);
                r.amount = Some(10_000.0 + id as f64 * 100.0);
                r
            })
            .collect();
        rows[0].product = None;
        rows[1].amount = None;
        rows[2].status = None;
        rows[3].amount = Some(5_000_000.0);
        rows[4].date = Some("2024.03.15".into());
        rows[5].city = Some(misdecode("서울"));
        rows.push(rows[10].clone());
        Dataset::new(rows)
    }

    #[test]
    fn test_clean_repairs_everything() {
        let (cleaned, log) = clean(&messy()).unwrap();
        assert_eq!(cleaned.len(), 39);
        assert!(cleaned.iter().all(|r| Column::all().iter().all(|c| !r.is_missing(*c))));
        assert!(cleaned.iter().all(|r| r.date.as_deref() == Some("2024-03-15")));
        assert!(cleaned.iter().all(|r| r.city.as_deref() == Some("서울")));

        let actions: Vec<CleaningAction> = log.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                CleaningAction::DropRow,
                CleaningAction::ImputeNumeric,
                CleaningAction::ImputeCategorical,
                CleaningAction::Deduplicate,
                CleaningAction::CapOutlier,
                CleaningAction::StandardizeFormat,
                CleaningAction::RepairEncoding,
            ]
        );
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let (once, _) = clean(&messy()).unwrap();
        let (twice, log) = clean(&once).unwrap();
        assert_eq!(once, twice);
        assert!(log.is_empty(), "unexpected: {:?}", log);
    }

    #[test]
    fn test_loaded_rows_out_of_range_are_dropped() {
        let record = |id: u64, tier: u8, category: &str, amount: f64, city: &str| {
            format!(
                r#"{{"id": {id}, "income_tier": {tier}, "category": "{category}",
                "product": "Rice", "amount": {amount:.1}, "date": "2024-03-15",
                "city": "{city}", "status": "completed"}}"#
            )
        };
        let content = format!(
            "[{}, {}, {}, {}]",
            record(1, 3, "Food", 12_000.0, "서울"),
            record(2, 9, "Food", -500.0, "Atlantis"),
            record(3, 2, "", 11_000.0, "서울"),
            record(4, 4, "Food", -20.0, "부산"),
        );
        let dataset = crate::io::parse_dataset(&content).unwrap();
        let (cleaned, log) = clean(&dataset).unwrap();

        assert_eq!(cleaned.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(cleaned
            .iter()
            .all(|r| Column::range_checked().iter().all(|c| !r.is_out_of_range(*c))));
        assert_eq!(log.affected_in(CleaningAction::DropRow, Column::IncomeTier), 1);
        assert_eq!(log.affected_in(CleaningAction::DropRow, Column::Amount), 1);
        assert_eq!(log.entries()[0].parameters["reason"], "out of range");
        assert_eq!(cleaned.rows()[1].category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_unknown_critical_column_is_schema_error() {
        let cleaner = QualityCleaner::default().with_critical_column("customer_id");
        let err = cleaner.clean(&messy()).unwrap_err();
        match err {
            PipelineError::Schema { stage, column } => {
                assert_eq!(stage, "clean");
                assert_eq!(column, "customer_id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_critical_column() {
        let cleaner = QualityCleaner::default().with_critical_column("amount");
        let (cleaned, log) = cleaner.clean(&messy()).unwrap();
        assert!(cleaned.iter().all(|r| r.amount.is_some()));
        assert_eq!(log.affected(CleaningAction::ImputeNumeric), 0);
        assert_eq!(log.affected_in(CleaningAction::DropRow, Column::Amount), 1);
    }
}
