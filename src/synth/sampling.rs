//! Sampling primitives for the synthesizer

use crate::error::{PipelineError, PipelineResult};
use crate::source::CalendarEffects;
use chrono::{Datelike, Duration, NaiveDate};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

/// Build a categorical distribution, mapping rand's weight errors to a
/// configuration error for `what`.
pub(crate) fn categorical(
    stage: &'static str,
    what: &str,
    weights: &[f64],
) -> PipelineResult<WeightedIndex<f64>> {
    WeightedIndex::new(weights.iter().copied()).map_err(|e| {
        PipelineError::config(stage, format!("{what} weights are unusable: {e}"))
    })
}

/// Draws days of one calendar year, favoring boosted windows.
///
/// A uniform day is proposed and accepted with probability
/// `boost(day) / max_boost`; rejected proposals are redrawn. Windows outside
/// the year do not contribute to `max_boost`.
#[derive(Debug, Clone)]
pub struct CalendarSampler {
    first_day: NaiveDate,
    days: u32,
    effects: CalendarEffects,
    max_boost: f64,
}

impl CalendarSampler {
    pub fn new(year: i32, effects: &CalendarEffects) -> PipelineResult<Self> {
        let invalid = || PipelineError::config("synthesize", format!("invalid survey year {year}"));
        let first_day = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        let next_year = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?;
        let days = (next_year - first_day).num_days() as u32;
        let last_day = next_year - Duration::days(1);

        let max_boost = effects
            .rows()
            .iter()
            .filter(|e| e.start <= last_day && e.end >= first_day)
            .map(|e| e.boost)
            .fold(1.0, f64::max);

        Ok(Self {
            first_day,
            days,
            effects: effects.clone(),
            max_boost,
        })
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        loop {
            let offset = rng.random_range(0..self.days);
            let day = self.first_day + Duration::days(i64::from(offset));
            if self.max_boost <= 1.0 {
                return day;
            }
            if rng.random::<f64>() * self.max_boost < self.effects.boost_on(day) {
                return day;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CalendarEffect;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
    }

    #[test]
    fn test_zero_weights_are_configuration_errors() {
        let err = categorical("synthesize", "city", &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(categorical("synthesize", "city", &[]).is_err());
        assert!(categorical("synthesize", "city", &[1.0, 0.0]).is_ok());
    }

    #[test]
    fn test_days_stay_inside_the_year() {
        let sampler = CalendarSampler::new(2024, &CalendarEffects::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..2_000 {
            assert_eq!(sampler.sample(&mut rng).year(), 2024);
        }
    }

    #[test]
    fn test_boosted_window_is_oversampled() {
        let effects = CalendarEffects::new(vec![CalendarEffect {
            label: "sale".into(),
            start: day(6, 1),
            end: day(6, 10),
            boost: 4.0,
        }]);
        let sampler = CalendarSampler::new(2024, &effects).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let draws = 20_000;
        let inside = (0..draws)
            .filter(|_| effects.rows()[0].contains(sampler.sample(&mut rng)))
            .count();
        // Uniform share would be 10/366; boosted share is 40/396.
        let share = inside as f64 / draws as f64;
        assert!(share > 0.07 && share < 0.13, "share = {share}");
    }

    #[test]
    fn test_windows_in_other_years_are_ignored() {
        let effects = CalendarEffects::new(vec![CalendarEffect {
            label: "elsewhere".into(),
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2019, 1, 5).unwrap(),
            boost: 9.0,
        }]);
        let sampler = CalendarSampler::new(2024, &effects).unwrap();
        assert_eq!(sampler.max_boost, 1.0);
    }
}
