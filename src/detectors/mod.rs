//! Data quality detector
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     QualityDetector                         │
//! │  - Runs the independent checks in parallel (rayon::join)    │
//! │  - Scores the results with QualityScorer                    │
//! │  - Returns a fresh, immutable QualityReport                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!      ┌──────────────┬────────┼────────────┬──────────────┬────────────┐
//!      ▼              ▼        ▼            ▼              ▼            ▼
//!   missing      duplicates  outliers    formats       encoding     validity
//!  (per column)  (full row)  (IQR ×3)   (date buckets) (mis-decode) (tier, amount)
//! ```
//!
//! Every check is a pure function of the dataset, so the report is
//! deterministic regardless of how the checks are scheduled.

mod duplicates;
mod encoding;
mod formats;
mod missing;
mod outliers;
mod validity;

pub use duplicates::{find_duplicates, DuplicateStats};
pub use encoding::encoding_issues;
pub use formats::{format_variants, is_inconsistent, FormatHistogram};
pub use missing::{missing_by_column, MissingStat};
pub use outliers::{find_outliers, OutlierScan, OutlierStat};
pub use validity::{find_out_of_range, RangeScan};

use crate::config::ScoringConfig;
use crate::models::{Column, Dataset};
use crate::scoring::{QualityScorer, ScoreInputs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Snapshot of a dataset's quality. Created fresh by each `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub row_count: usize,
    pub column_count: usize,
    pub missing_by_column: BTreeMap<Column, MissingStat>,
    pub total_missing: usize,
    pub duplicate_count: usize,
    pub duplicate_groups: usize,
    pub outlier_by_column: BTreeMap<Column, OutlierStat>,
    /// Rows flagged in at least one numeric column
    pub outlier_rows: usize,
    pub format_variants: BTreeMap<Column, FormatHistogram>,
    pub encoding_issues: BTreeMap<Column, usize>,
    /// Present values outside the allowed range (tier 1-5, amount >= 0)
    pub invalid_by_column: BTreeMap<Column, usize>,
    pub invalid_rows: usize,
    /// Points deducted per dimension
    pub penalties: BTreeMap<String, f64>,
    pub score: f64,
    pub grade: String,
}

impl QualityReport {
    pub fn missing(&self, column: Column) -> usize {
        self.missing_by_column.get(&column).map_or(0, |s| s.count)
    }

    pub fn outliers(&self, column: Column) -> usize {
        self.outlier_by_column.get(&column).map_or(0, |s| s.count)
    }

    pub fn total_encoding_issues(&self) -> usize {
        self.encoding_issues.values().sum()
    }

    pub fn has_format_inconsistency(&self) -> bool {
        is_inconsistent(&self.format_variants)
    }

    /// Nothing found in any dimension
    pub fn is_clean(&self) -> bool {
        self.total_missing == 0
            && self.invalid_rows == 0
            && self.duplicate_count == 0
            && self.outlier_rows == 0
            && !self.has_format_inconsistency()
            && self.total_encoding_issues() == 0
    }
}

/// Scans datasets and scores them
#[derive(Debug, Clone, Default)]
pub struct QualityDetector {
    scoring: ScoringConfig,
}

impl QualityDetector {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn analyze(&self, dataset: &Dataset) -> QualityReport {
        let (((missing, invalid), dups), (outliers, (formats, encoding))) = rayon::join(
            || {
                rayon::join(
                    || rayon::join(|| missing_by_column(dataset), || find_out_of_range(dataset)),
                    || find_duplicates(dataset),
                )
            },
            || {
                rayon::join(
                    || find_outliers(dataset),
                    || rayon::join(|| format_variants(dataset), || encoding_issues(dataset)),
                )
            },
        );

        let rows = dataset.len();
        let columns = dataset.column_count();
        let total_missing: usize = missing.values().map(|s| s.count).sum();
        let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };

        let inputs = ScoreInputs {
            missing_ratio: ratio(total_missing, rows * columns),
            duplicate_ratio: ratio(dups.duplicate_rows, rows),
            outlier_ratio: ratio(outliers.rows.len(), rows),
            format_inconsistent: is_inconsistent(&formats),
            encoding_issues: encoding.values().any(|&n| n > 0),
            invalid_ratio: ratio(invalid.rows, rows),
        };
        let breakdown = QualityScorer::new(&self.scoring).calculate(&inputs);

        info!(
            "Analyzed {} rows: {} missing, {} out of range, {} duplicates, {} outlier rows, score {:.1}",
            rows,
            total_missing,
            invalid.rows,
            dups.duplicate_rows,
            outliers.rows.len(),
            breakdown.score
        );

        QualityReport {
            row_count: rows,
            column_count: columns,
            missing_by_column: missing,
            total_missing,
            duplicate_count: dups.duplicate_rows,
            duplicate_groups: dups.groups,
            outlier_by_column: outliers.by_column,
            outlier_rows: outliers.rows.len(),
            format_variants: formats,
            encoding_issues: encoding,
            invalid_by_column: invalid.by_column,
            invalid_rows: invalid.rows,
            penalties: breakdown.penalty_map(),
            score: breakdown.score,
            grade: breakdown.grade,
        }
    }
}

/// Analyze with default scoring weights
pub fn analyze(dataset: &Dataset) -> QualityReport {
    QualityDetector::default().analyze(dataset)
}
