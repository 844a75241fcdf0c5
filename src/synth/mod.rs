//! Transaction synthesizer
//!
//! Expands aggregate survey tables into individual purchases. Each record is
//! drawn in a fixed order: tier → category → product → amount → date → city
//! → status. All draws come from one explicitly passed RNG, so the same seed
//! reproduces the same dataset bit for bit.

mod sampling;

pub use sampling::CalendarSampler;

use crate::config::SynthesisConfig;
use crate::dates::canonical;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dataset, Status, Transaction};
use crate::source::{AggregateSource, TIERS};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sampling::categorical;
use tracing::{debug, info};

const STAGE: &str = "synthesize";

/// ChaCha stream reserved for synthesis; the injector uses its own stream
pub const SYNTH_STREAM: u64 = 0;

/// Seeded RNG for the synthesis stream
pub fn synthesis_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(SYNTH_STREAM);
    rng
}

/// Category resolved for sampling: name, products, average per tier
#[derive(Debug, Clone)]
struct CategorySlot {
    name: String,
    products: Vec<String>,
    averages: [f64; 5],
}

/// Draws synthetic transactions from an `AggregateSource`.
///
/// All distributions are built once in `new`, so a bad weight table fails
/// before the first record is drawn.
pub struct TransactionSynthesizer {
    categories: Vec<CategorySlot>,
    tier_dist: WeightedIndex<f64>,
    /// One category distribution per income tier
    category_dists: Vec<WeightedIndex<f64>>,
    cities: Vec<String>,
    city_dist: WeightedIndex<f64>,
    status_dist: WeightedIndex<f64>,
    calendar: CalendarSampler,
    tier_multipliers: [f64; 5],
    variance_band: (f64, f64),
    granularity: f64,
}

impl TransactionSynthesizer {
    pub fn new(source: &AggregateSource, config: &SynthesisConfig) -> PipelineResult<Self> {
        config.check(STAGE)?;
        source.validate()?;

        let index = source.statistics.index();
        let categories: Vec<CategorySlot> = source
            .catalog
            .profiles()
            .iter()
            .map(|profile| -> PipelineResult<CategorySlot> {
                let mut averages = [0.0; 5];
                for (slot, tier) in averages.iter_mut().zip(TIERS) {
                    *slot = index
                        .get(&(profile.name.as_str(), tier))
                        .copied()
                        .ok_or_else(|| {
                            PipelineError::config(
                                STAGE,
                                format!("no statistic for '{}' tier {}", profile.name, tier),
                            )
                        })?;
                }
                Ok(CategorySlot {
                    name: profile.name.clone(),
                    products: profile.products.clone(),
                    averages,
                })
            })
            .collect::<PipelineResult<_>>()?;

        let tier_dist = categorical(STAGE, "income tier", &config.tier_weights)?;
        let category_dists = TIERS
            .iter()
            .map(|&tier| {
                let weights = source.catalog.weights_for_tier(tier, config.essential_bias);
                categorical(STAGE, &format!("tier {tier} category"), &weights)
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let geo = source.geo_weights.rows();
        let cities = geo.iter().map(|g| g.city.clone()).collect();
        let city_weights: Vec<f64> = geo.iter().map(|g| g.weight).collect();
        let city_dist = categorical(STAGE, "city", &city_weights)?;
        let status_dist = categorical(STAGE, "status", &config.status_weights.as_array())?;

        let calendar = CalendarSampler::new(config.survey_year, &source.calendar_effects)?;

        debug!(
            "Synthesizer ready: {} categories, {} cities, survey year {}",
            categories.len(),
            geo.len(),
            calendar.year()
        );

        Ok(Self {
            categories,
            tier_dist,
            category_dists,
            cities,
            city_dist,
            status_dist,
            calendar,
            tier_multipliers: config.tier_multipliers,
            variance_band: config.variance_band,
            granularity: config.currency_granularity,
        })
    }

    /// Draw `n` transactions from the synthesis stream of `seed`
    pub fn synthesize(&self, n: usize, seed: u64) -> PipelineResult<Dataset> {
        let mut rng = synthesis_rng(seed);
        let dataset = self.synthesize_with_rng(n, &mut rng)?;
        info!("Synthesized {} transactions (seed {})", dataset.len(), seed);
        Ok(dataset)
    }

    /// Draw `n` transactions from a caller-owned RNG
    pub fn synthesize_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> PipelineResult<Dataset> {
        if n < 1 {
            return Err(PipelineError::config(
                STAGE,
                "number of transactions must be at least 1",
            ));
        }
        Ok((1..=n as u64).map(|id| self.draw(id, rng)).collect())
    }

    fn draw<R: Rng + ?Sized>(&self, id: u64, rng: &mut R) -> Transaction {
        let tier_idx = self.tier_dist.sample(rng);
        let tier = TIERS[tier_idx];

        let slot = &self.categories[self.category_dists[tier_idx].sample(rng)];
        let product = &slot.products[rng.random_range(0..slot.products.len())];

        let (lo, hi) = self.variance_band;
        let variance = 1.0 + lo + (hi - lo) * rng.random::<f64>();
        let raw = slot.averages[tier_idx] * self.tier_multipliers[tier_idx] * variance;
        let amount = ((raw / self.granularity).round() * self.granularity).max(0.0);

        let date = self.calendar.sample(rng);
        let city = &self.cities[self.city_dist.sample(rng)];
        let status = Status::all()[self.status_dist.sample(rng)];

        Transaction {
            id,
            income_tier: Some(tier),
            category: Some(slot.name.clone()),
            product: Some(product.clone()),
            amount: Some(amount),
            date: Some(canonical(date)),
            city: Some(city.clone()),
            status: Some(status),
        }
    }
}

/// Convenience wrapper: build a synthesizer and draw `n` rows
pub fn synthesize(
    source: &AggregateSource,
    config: &SynthesisConfig,
    n: usize,
    seed: u64,
) -> PipelineResult<Dataset> {
    TransactionSynthesizer::new(source, config)?.synthesize(n, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;
    use std::collections::HashSet;

    fn defaults() -> (AggregateSource, SynthesisConfig) {
        (AggregateSource::builtin(2024), SynthesisConfig::default())
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let (source, config) = defaults();
        let a = synthesize(&source, &config, 500, 42).unwrap();
        let b = synthesize(&source, &config, 500, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );

        let c = synthesize(&source, &config, 500, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_every_field_populated_and_valid() {
        let (source, config) = defaults();
        let ds = synthesize(&source, &config, 1_000, 42).unwrap();
        assert_eq!(ds.len(), 1_000);

        let cities: HashSet<&str> = source.geo_weights.rows().iter().map(|g| g.city.as_str()).collect();
        let ids: HashSet<u64> = ds.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 1_000);

        for row in &ds {
            for col in Column::all() {
                assert!(!row.is_missing(*col), "row {} missing {}", row.id, col);
            }
            let tier = row.income_tier.unwrap();
            assert!((1..=5).contains(&tier));
            let amount = row.amount.unwrap();
            assert!(amount >= 0.0);
            assert_eq!(amount % 10.0, 0.0);
            assert!(row.date.as_deref().unwrap().starts_with("2024-"));
            assert!(cities.contains(row.city.as_deref().unwrap()));
        }
    }

    #[test]
    fn test_higher_tiers_spend_more() {
        let (source, config) = defaults();
        let ds = synthesize(&source, &config, 5_000, 3).unwrap();
        let mean = |tier: u8| {
            let v: Vec<f64> = ds
                .iter()
                .filter(|r| r.income_tier == Some(tier))
                .filter_map(|r| r.amount)
                .collect();
            v.iter().sum::<f64>() / v.len() as f64
        };
        assert!(mean(1) < mean(3));
        assert!(mean(3) < mean(5));
    }

    #[test]
    fn test_status_mostly_completed() {
        let (source, config) = defaults();
        let ds = synthesize(&source, &config, 2_000, 9).unwrap();
        let completed = ds.iter().filter(|r| r.status == Some(Status::Completed)).count();
        let share = completed as f64 / 2_000.0;
        assert!(share > 0.88 && share < 0.96, "share = {share}");
    }

    #[test]
    fn test_zero_rows_is_configuration_error() {
        let (source, config) = defaults();
        let err = synthesize(&source, &config, 0, 42).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { stage: "synthesize", .. }));
    }

    #[test]
    fn test_zero_sum_tier_weights_rejected() {
        let (source, mut config) = defaults();
        config.tier_weights = [0.0; 5];
        assert!(TransactionSynthesizer::new(&source, &config).is_err());
    }

    #[test]
    fn test_bad_sampling_settings_rejected_before_drawing() {
        let (source, base) = defaults();
        let broken = [
            SynthesisConfig { currency_granularity: 0.0, ..base.clone() },
            SynthesisConfig { variance_band: (-1.0, 0.3), ..base.clone() },
            SynthesisConfig { variance_band: (0.3, -0.3), ..base.clone() },
            SynthesisConfig { tier_multipliers: [1.8, 1.5, 1.2, 0.9, 0.6], ..base.clone() },
            SynthesisConfig { essential_bias: f64::NAN, ..base.clone() },
        ];
        for config in &broken {
            match TransactionSynthesizer::new(&source, config) {
                Err(PipelineError::Configuration { stage, .. }) => assert_eq!(stage, "synthesize"),
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("accepted {config:?}"),
            }
        }
    }

    #[test]
    fn test_single_tier_distribution() {
        let (source, mut config) = defaults();
        config.tier_weights = [0.0, 0.0, 0.0, 0.0, 1.0];
        let ds = synthesize(&source, &config, 200, 1).unwrap();
        assert!(ds.iter().all(|r| r.income_tier == Some(5)));
    }
}
