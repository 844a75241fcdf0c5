//! Defect injection
//!
//! Degrades a clean dataset in a fixed order: missing values, outliers,
//! date format variants, encoding corruption, then duplicates. Duplicates go
//! last so that every appended copy is byte-identical to a row that already
//! carries its other defects.
//!
//! Each class selects `round(rate × rows)` distinct rows without
//! replacement, capped at the number of rows eligible for that class.

pub mod encoding;
mod manifest;

pub use manifest::{DefectKind, DefectManifest, DefectRecord};

use crate::config::DefectConfig;
use crate::dates::{parse_any, DateFormat};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Column, Dataset, Transaction};
use encoding::misdecode;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

const STAGE: &str = "inject";

/// ChaCha stream reserved for injection
pub const INJECT_STREAM: u64 = 1;

/// Seeded RNG for the injection stream
pub fn injection_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(INJECT_STREAM);
    rng
}

/// Applies configured defects to a copy of a dataset
#[derive(Debug, Clone)]
pub struct DefectInjector {
    config: DefectConfig,
    columns: Vec<Column>,
}

impl DefectInjector {
    pub fn new(config: DefectConfig) -> PipelineResult<Self> {
        for (name, rate) in config.rates() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PipelineError::config(
                    STAGE,
                    format!("defect rate '{name}' = {rate} is outside [0, 1]"),
                ));
            }
        }
        if !(config.outlier_factor > 0.0) || !config.outlier_factor.is_finite() {
            return Err(PipelineError::config(STAGE, "outlier factor must be positive"));
        }
        let columns = config.resolved_missing_columns()?;
        Ok(Self { config, columns })
    }

    /// Inject from the injection stream of `seed`
    pub fn inject(&self, dataset: &Dataset, seed: u64) -> (Dataset, DefectManifest) {
        let mut rng = injection_rng(seed);
        self.inject_with_rng(dataset, &mut rng)
    }

    pub fn inject_with_rng<R: Rng + ?Sized>(
        &self,
        dataset: &Dataset,
        rng: &mut R,
    ) -> (Dataset, DefectManifest) {
        let mut rows = dataset.rows().to_vec();
        let mut manifest = DefectManifest::new();
        let total = rows.len();
        let target = |rate: f64| (rate * total as f64).round() as usize;

        for &column in &self.columns {
            let eligible: Vec<usize> = (0..rows.len()).filter(|&i| !rows[i].is_missing(column)).collect();
            for i in pick(rng, &eligible, target(self.config.missing)) {
                rows[i].clear(column);
                manifest.push(i, Some(column), DefectKind::MissingValue);
            }
        }

        let eligible: Vec<usize> = (0..rows.len()).filter(|&i| rows[i].amount.is_some()).collect();
        for i in pick(rng, &eligible, target(self.config.outlier)) {
            if let Some(amount) = rows[i].amount.as_mut() {
                *amount *= self.config.outlier_factor;
                manifest.push(i, Some(Column::Amount), DefectKind::Outlier);
            }
        }

        let eligible: Vec<usize> = (0..rows.len())
            .filter(|&i| rows[i].date.as_deref().and_then(parse_any).is_some())
            .collect();
        for i in pick(rng, &eligible, target(self.config.format_variant)) {
            if rerender_date(&mut rows[i], rng) {
                manifest.push(i, Some(Column::Date), DefectKind::FormatVariant);
            }
        }

        let eligible: Vec<usize> = (0..rows.len()).filter(|&i| has_non_ascii(&rows[i])).collect();
        for i in pick(rng, &eligible, target(self.config.encoding)) {
            for &column in Column::text() {
                if let Some(Some(value)) = rows[i].text_slot(column) {
                    if !value.is_ascii() {
                        *value = misdecode(value);
                        manifest.push(i, Some(column), DefectKind::EncodingCorruption);
                    }
                }
            }
        }

        let eligible: Vec<usize> = (0..total).collect();
        for i in pick(rng, &eligible, target(self.config.duplicate)) {
            let copy = rows[i].clone();
            rows.push(copy);
            manifest.push(rows.len() - 1, None, DefectKind::Duplicate);
        }

        for (kind, count) in manifest.summary() {
            debug!("Injected {} {} defects", count, kind);
        }
        info!(
            "Injected {} defects into {} rows ({} rows out)",
            manifest.len(),
            total,
            rows.len()
        );

        (Dataset::new(rows), manifest)
    }
}

/// Up to `amount` distinct members of `eligible`, ascending
fn pick<R: Rng + ?Sized>(rng: &mut R, eligible: &[usize], amount: usize) -> Vec<usize> {
    let amount = amount.min(eligible.len());
    if amount == 0 {
        return Vec::new();
    }
    let mut chosen: Vec<usize> = index::sample(rng, eligible.len(), amount)
        .into_iter()
        .map(|i| eligible[i])
        .collect();
    chosen.sort_unstable();
    chosen
}

fn rerender_date<R: Rng + ?Sized>(row: &mut Transaction, rng: &mut R) -> bool {
    let Some((_, date)) = row.date.as_deref().and_then(parse_any) else {
        return false;
    };
    let variants = DateFormat::variants();
    let format = variants[rng.random_range(0..variants.len())];
    let hour = rng.random_range(0..24);
    let minute = rng.random_range(0..60);
    row.date = Some(format.render(date, hour, minute));
    true
}

fn has_non_ascii(row: &Transaction) -> bool {
    Column::text()
        .iter()
        .filter_map(|c| row.text(*c))
        .any(|s| !s.is_ascii())
}

/// Build an injector and run it on `dataset`
pub fn inject(
    dataset: &Dataset,
    config: &DefectConfig,
    seed: u64,
) -> PipelineResult<(Dataset, DefectManifest)> {
    Ok(DefectInjector::new(config.clone())?.inject(dataset, seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::classify;
    use crate::models::tests::sample_row;

    fn clean(n: u64) -> Dataset {
        (1..=n)
            .map(|id| {
                let mut row = sample_row(id);
                row.amount = Some(10_000.0 + id as f64 * 10.0);
                row
            })
            .collect()
    }

    fn only(config: DefectConfig) -> DefectInjector {
        DefectInjector::new(config).unwrap()
    }

    #[test]
    fn test_no_defects_is_identity() {
        let ds = clean(100);
        let (out, manifest) = only(DefectConfig::none()).inject(&ds, 1);
        assert_eq!(out, ds);
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_missing_exact_count_without_replacement() {
        let ds = clean(1_000);
        let config = DefectConfig {
            missing: 0.05,
            ..DefectConfig::none()
        };
        let (out, manifest) = only(config).inject(&ds, 42);
        let nulls = out.iter().filter(|r| r.amount.is_none()).count();
        assert_eq!(nulls, 50);
        assert_eq!(manifest.count_for(DefectKind::MissingValue, Column::Amount), 50);
        for record in manifest.records() {
            assert!(out.rows()[record.row].amount.is_none());
        }
    }

    #[test]
    fn test_duplicates_are_verbatim_and_appended() {
        let ds = clean(1_000);
        let config = DefectConfig {
            duplicate: 0.03,
            ..DefectConfig::none()
        };
        let (out, manifest) = only(config).inject(&ds, 42);
        assert_eq!(out.len(), 1_030);
        assert_eq!(manifest.count(DefectKind::Duplicate), 30);
        for row in &out.rows()[1_000..] {
            assert!(ds.iter().any(|orig| orig == row));
        }
    }

    #[test]
    fn test_outliers_multiply_amount() {
        let ds = clean(1_000);
        let config = DefectConfig {
            outlier: 0.02,
            ..DefectConfig::none()
        };
        let (out, manifest) = only(config).inject(&ds, 5);
        assert_eq!(manifest.count(DefectKind::Outlier), 20);
        for record in manifest.records() {
            let before = ds.rows()[record.row].amount.unwrap();
            let after = out.rows()[record.row].amount.unwrap();
            assert_eq!(after, before * 10.0);
        }
    }

    #[test]
    fn test_format_variants_leave_iso() {
        let ds = clean(500);
        let config = DefectConfig {
            format_variant: 0.1,
            ..DefectConfig::none()
        };
        let (out, manifest) = only(config).inject(&ds, 8);
        assert_eq!(manifest.count(DefectKind::FormatVariant), 50);
        for record in manifest.records() {
            let value = out.rows()[record.row].date.as_deref().unwrap();
            assert_ne!(classify(value), DateFormat::IsoDate);
            assert_ne!(classify(value), DateFormat::Unparseable);
        }
    }

    #[test]
    fn test_encoding_targets_non_ascii_text() {
        let ds = clean(200);
        let config = DefectConfig {
            encoding: 0.1,
            ..DefectConfig::none()
        };
        let (out, manifest) = only(config).inject(&ds, 3);
        // Only the city column carries non-ASCII text in the sample rows
        assert_eq!(manifest.count_for(DefectKind::EncodingCorruption, Column::City), 20);
        for record in manifest.records() {
            let city = out.rows()[record.row].city.as_deref().unwrap();
            assert!(encoding::looks_corrupted(city));
        }
    }

    #[test]
    fn test_same_seed_same_damage() {
        let ds = clean(300);
        let injector = only(DefectConfig::default());
        assert_eq!(injector.inject(&ds, 11), injector.inject(&ds, 11));
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        let config = DefectConfig {
            duplicate: 1.2,
            ..DefectConfig::none()
        };
        let err = DefectInjector::new(config).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { stage: "inject", .. }));
    }
}
