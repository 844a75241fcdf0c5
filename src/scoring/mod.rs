//! Data Quality Scoring
//!
//! # Scoring Formula
//!
//! ```text
//! Score = clamp(100 - penalties, 0, 100)
//!
//! penalties = missing_ratio   × 30    (missing cells / total cells)
//!           + duplicate_ratio × 20    (duplicate rows / rows)
//!           + outlier_ratio   × 20    (rows outside any IQR fence / rows)
//!           + invalid_ratio   × 20    (rows with a tier outside 1-5 or a
//!                                      negative or non-finite amount / rows)
//!           + 15 if any date column mixes formats
//!           + 15 if any text value looks mis-decoded
//! ```
//!
//! Weights come from `[scoring]` in `spendlab.toml`. The score is
//! non-increasing in every dimension for any non-negative weights.
//!
//! # Grades
//!
//! A ≥ 90, B ≥ 80, C ≥ 70, D ≥ 60, otherwise F.

mod quality_scorer;

pub use quality_scorer::{grade_from_score, Penalty, QualityScorer, ScoreBreakdown, ScoreInputs};
