//! Pipeline configuration
//!
//! Loads configuration from `spendlab.toml` or `.spendlabrc.json` in a
//! directory, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # spendlab.toml
//!
//! [synthesis]
//! rows = 1000
//! seed = 42
//! tier_multipliers = [0.6, 0.9, 1.2, 1.5, 1.8]
//! variance_band = [-0.3, 0.3]
//!
//! [defects]
//! missing = 0.05
//! missing_columns = ["amount"]
//! duplicate = 0.03
//!
//! [cleaning]
//! critical_column = "product"
//!
//! [scoring]
//! missing_weight = 30.0
//! ```
//!
//! Every option has a default; `validate()` checks ranges eagerly so a bad
//! value fails before any sampling happens.

use crate::error::{PipelineError, PipelineResult};
use crate::models::Column;
use crate::source::check_weights;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const STAGE: &str = "config";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub defects: DefectConfig,

    #[serde(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Transaction synthesis options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Number of transactions to draw (n)
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Seed for every random draw in the run
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Calendar year that dates are drawn from
    #[serde(default = "default_survey_year")]
    pub survey_year: i32,

    /// Relative probability of income tiers 1-5 (default: uniform)
    #[serde(default = "default_tier_weights")]
    pub tier_weights: [f64; 5],

    /// Amount multiplier per income tier, monotonically increasing
    #[serde(default = "default_tier_multipliers")]
    pub tier_multipliers: [f64; 5],

    /// Relative variance band applied to every amount, e.g. (-0.3, 0.3)
    #[serde(default = "default_variance_band")]
    pub variance_band: (f64, f64),

    /// Amounts round to a multiple of this (KRW)
    #[serde(default = "default_currency_granularity")]
    pub currency_granularity: f64,

    /// Strength of the essential/discretionary tilt across tiers
    #[serde(default = "default_essential_bias")]
    pub essential_bias: f64,

    #[serde(default)]
    pub status_weights: StatusWeights,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            seed: default_seed(),
            survey_year: default_survey_year(),
            tier_weights: default_tier_weights(),
            tier_multipliers: default_tier_multipliers(),
            variance_band: default_variance_band(),
            currency_granularity: default_currency_granularity(),
            essential_bias: default_essential_bias(),
            status_weights: StatusWeights::default(),
        }
    }
}

fn default_rows() -> usize {
    1000
}
fn default_seed() -> u64 {
    42
}
fn default_survey_year() -> i32 {
    2024
}
fn default_tier_weights() -> [f64; 5] {
    [1.0; 5]
}
fn default_tier_multipliers() -> [f64; 5] {
    [0.6, 0.9, 1.2, 1.5, 1.8]
}
fn default_variance_band() -> (f64, f64) {
    (-0.3, 0.3)
}
fn default_currency_granularity() -> f64 {
    10.0
}
fn default_essential_bias() -> f64 {
    0.15
}

/// Status distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusWeights {
    #[serde(default = "default_completed")]
    pub completed: f64,
    #[serde(default = "default_pending")]
    pub pending: f64,
    #[serde(default = "default_cancelled")]
    pub cancelled: f64,
}

impl Default for StatusWeights {
    fn default() -> Self {
        Self {
            completed: default_completed(),
            pending: default_pending(),
            cancelled: default_cancelled(),
        }
    }
}

fn default_completed() -> f64 {
    0.92
}
fn default_pending() -> f64 {
    0.05
}
fn default_cancelled() -> f64 {
    0.03
}

impl StatusWeights {
    /// Weights aligned with `Status::all()`
    pub fn as_array(&self) -> [f64; 3] {
        [self.completed, self.pending, self.cancelled]
    }
}

/// Defect injection rates, each in `[0, 1]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectConfig {
    #[serde(default = "default_missing_rate")]
    pub missing: f64,

    /// Columns that receive missing values
    #[serde(default = "default_missing_columns")]
    pub missing_columns: Vec<String>,

    #[serde(default = "default_duplicate_rate")]
    pub duplicate: f64,

    #[serde(default = "default_outlier_rate")]
    pub outlier: f64,

    /// Amount multiplier for injected outliers
    #[serde(default = "default_outlier_factor")]
    pub outlier_factor: f64,

    #[serde(default = "default_format_variant_rate")]
    pub format_variant: f64,

    #[serde(default = "default_encoding_rate")]
    pub encoding: f64,
}

impl Default for DefectConfig {
    fn default() -> Self {
        Self {
            missing: default_missing_rate(),
            missing_columns: default_missing_columns(),
            duplicate: default_duplicate_rate(),
            outlier: default_outlier_rate(),
            outlier_factor: default_outlier_factor(),
            format_variant: default_format_variant_rate(),
            encoding: default_encoding_rate(),
        }
    }
}

fn default_missing_rate() -> f64 {
    0.05
}
fn default_missing_columns() -> Vec<String> {
    vec!["amount".to_string()]
}
fn default_duplicate_rate() -> f64 {
    0.03
}
fn default_outlier_rate() -> f64 {
    0.02
}
fn default_outlier_factor() -> f64 {
    10.0
}
fn default_format_variant_rate() -> f64 {
    0.04
}
fn default_encoding_rate() -> f64 {
    0.02
}

impl DefectConfig {
    /// No defects at all
    pub fn none() -> Self {
        Self {
            missing: 0.0,
            duplicate: 0.0,
            outlier: 0.0,
            format_variant: 0.0,
            encoding: 0.0,
            ..Default::default()
        }
    }

    /// Named rates, for validation and logging
    pub fn rates(&self) -> [(&'static str, f64); 5] {
        [
            ("missing", self.missing),
            ("duplicate", self.duplicate),
            ("outlier", self.outlier),
            ("format_variant", self.format_variant),
            ("encoding", self.encoding),
        ]
    }

    /// Resolve `missing_columns` against the schema
    pub fn resolved_missing_columns(&self) -> PipelineResult<Vec<Column>> {
        self.missing_columns
            .iter()
            .map(|name| match Column::from_name(name) {
                Some(c) if c.is_nullable() => Ok(c),
                Some(c) => Err(PipelineError::config(
                    STAGE,
                    format!("column '{}' cannot receive missing values", c),
                )),
                None => Err(PipelineError::config(
                    STAGE,
                    format!("unknown column '{}' in defects.missing_columns", name),
                )),
            })
            .collect()
    }
}

/// Cleaner options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Rows missing this column are dropped outright
    #[serde(default = "default_critical_column")]
    pub critical_column: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            critical_column: default_critical_column(),
        }
    }
}

fn default_critical_column() -> String {
    "product".to_string()
}

/// Quality score penalty weights.
///
/// Score = 100 - (missing_ratio × missing_weight + duplicate_ratio ×
/// duplicate_weight + outlier_ratio × outlier_weight + invalid_ratio ×
/// invalid_weight + format_penalty if any format inconsistency +
/// encoding_penalty if any encoding issue), clamped to [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_missing_weight")]
    pub missing_weight: f64,
    #[serde(default = "default_duplicate_weight")]
    pub duplicate_weight: f64,
    #[serde(default = "default_outlier_weight")]
    pub outlier_weight: f64,
    #[serde(default = "default_format_penalty")]
    pub format_penalty: f64,
    #[serde(default = "default_encoding_penalty")]
    pub encoding_penalty: f64,
    /// Per fraction of rows holding an out-of-range tier or amount
    #[serde(default = "default_invalid_weight")]
    pub invalid_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            missing_weight: default_missing_weight(),
            duplicate_weight: default_duplicate_weight(),
            outlier_weight: default_outlier_weight(),
            format_penalty: default_format_penalty(),
            encoding_penalty: default_encoding_penalty(),
            invalid_weight: default_invalid_weight(),
        }
    }
}

fn default_missing_weight() -> f64 {
    30.0
}
fn default_duplicate_weight() -> f64 {
    20.0
}
fn default_outlier_weight() -> f64 {
    20.0
}
fn default_format_penalty() -> f64 {
    15.0
}
fn default_encoding_penalty() -> f64 {
    15.0
}
fn default_invalid_weight() -> f64 {
    20.0
}

impl ScoringConfig {
    fn weights(&self) -> [(&'static str, f64); 6] {
        [
            ("missing_weight", self.missing_weight),
            ("duplicate_weight", self.duplicate_weight),
            ("outlier_weight", self.outlier_weight),
            ("format_penalty", self.format_penalty),
            ("encoding_penalty", self.encoding_penalty),
            ("invalid_weight", self.invalid_weight),
        ]
    }
}

impl SynthesisConfig {
    /// Range checks on the sampling settings, reported under `stage`.
    ///
    /// The row count is checked by the caller that knows it.
    pub fn check(&self, stage: &'static str) -> PipelineResult<()> {
        check_weights(stage, "income tier", self.tier_weights)?;
        check_weights(stage, "status", self.status_weights.as_array())?;

        if self.tier_multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(PipelineError::config(
                stage,
                "tier multipliers must be finite and non-negative",
            ));
        }
        if self.tier_multipliers.windows(2).any(|w| w[1] < w[0]) {
            return Err(PipelineError::config(
                stage,
                "tier multipliers must increase with the tier",
            ));
        }

        let (lo, hi) = self.variance_band;
        if !lo.is_finite() || !hi.is_finite() || lo > hi || lo <= -1.0 {
            return Err(PipelineError::config(
                stage,
                format!("variance band ({lo}, {hi}) must satisfy -1 < lo ≤ hi"),
            ));
        }
        if !(self.currency_granularity > 0.0) || !self.currency_granularity.is_finite() {
            return Err(PipelineError::config(
                stage,
                "currency granularity must be positive",
            ));
        }
        if !self.essential_bias.is_finite() || self.essential_bias < 0.0 {
            return Err(PipelineError::config(
                stage,
                "essential bias must be non-negative",
            ));
        }
        if chrono::NaiveDate::from_ymd_opt(self.survey_year, 1, 1).is_none() {
            return Err(PipelineError::config(
                stage,
                format!("survey year {} is out of range", self.survey_year),
            ));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Validate every option. Called at pipeline entry.
    pub fn validate(&self) -> PipelineResult<()> {
        let s = &self.synthesis;
        if s.rows < 1 {
            return Err(PipelineError::config(STAGE, "synthesis.rows must be at least 1"));
        }
        s.check(STAGE)?;

        for (name, rate) in self.defects.rates() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PipelineError::config(
                    STAGE,
                    format!("defect rate '{name}' = {rate} is outside [0, 1]"),
                ));
            }
        }
        if !(self.defects.outlier_factor > 0.0) || !self.defects.outlier_factor.is_finite() {
            return Err(PipelineError::config(STAGE, "outlier factor must be positive"));
        }
        self.defects.resolved_missing_columns()?;

        if self.cleaning.critical_column.trim().is_empty() {
            return Err(PipelineError::config(STAGE, "critical column is empty"));
        }

        for (name, weight) in self.scoring.weights() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PipelineError::config(
                    STAGE,
                    format!("scoring.{name} must be a non-negative number"),
                ));
            }
        }
        Ok(())
    }
}

/// Load configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `spendlab.toml`
/// 2. `.spendlabrc.json`
///
/// Returns defaults if no file is found or the file fails to parse.
pub fn load_pipeline_config(dir: &Path) -> PipelineConfig {
    let toml_path = dir.join("spendlab.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded pipeline config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = dir.join(".spendlabrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded pipeline config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No pipeline config found, using defaults");
    PipelineConfig::default()
}

/// Load an explicit config file; the extension picks the parser
pub fn load_config_file(path: &Path) -> anyhow::Result<PipelineConfig> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json_config(path),
        _ => load_toml_config(path),
    }
}

fn load_toml_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: PipelineConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: PipelineConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Commented template written by `spendlab init`
pub const DEFAULT_CONFIG_TOML: &str = r#"# spendlab configuration

[synthesis]
# Number of transactions to synthesize
rows = 1000
# Seed for all random draws (same seed, same dataset)
seed = 42
survey_year = 2024
# Relative probability of income tiers 1-5
tier_weights = [1.0, 1.0, 1.0, 1.0, 1.0]
# Amount multiplier per tier
tier_multipliers = [0.6, 0.9, 1.2, 1.5, 1.8]
# Uniform relative variance applied to every amount
variance_band = [-0.3, 0.3]
currency_granularity = 10.0
essential_bias = 0.15

[synthesis.status_weights]
completed = 0.92
pending = 0.05
cancelled = 0.03

[defects]
# Rates are fractions of the row count, each in [0, 1]
missing = 0.05
missing_columns = ["amount"]
duplicate = 0.03
outlier = 0.02
outlier_factor = 10.0
format_variant = 0.04
encoding = 0.02

[cleaning]
# Rows missing this column are dropped instead of imputed
critical_column = "product"

[scoring]
missing_weight = 30.0
duplicate_weight = 20.0
outlier_weight = 20.0
format_penalty = 15.0
encoding_penalty = 15.0
# Tier outside 1-5, negative or non-finite amount
invalid_weight = 20.0
"#;
