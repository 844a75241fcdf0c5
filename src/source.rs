//! Aggregate survey inputs
//!
//! The synthesizer reads four read-only tables:
//! - `CategoryStatistics`: average spend per (category, income tier)
//! - `CategoryCatalog`: draw weight, essential flag and products per category
//! - `GeoWeights`: relative weight per city
//! - `CalendarEffects`: date windows with a draw boost
//!
//! Built-in defaults model a household expenditure survey with the twelve
//! COICOP spending divisions and the largest Korean cities. A full source can
//! also be loaded from JSON.

use crate::error::{PipelineError, PipelineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

pub const TIERS: [u8; 5] = [1, 2, 3, 4, 5];

const STAGE: &str = "source";

/// Average amount for one (category, tier) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatistic {
    pub category: String,
    pub income_tier: u8,
    pub average_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryStatistics {
    rows: Vec<CategoryStatistic>,
}

impl CategoryStatistics {
    pub fn new(rows: Vec<CategoryStatistic>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CategoryStatistic] {
        &self.rows
    }

    /// Index by (category, tier). Later rows win on duplicates.
    pub fn index(&self) -> HashMap<(&str, u8), f64> {
        self.rows
            .iter()
            .map(|r| ((r.category.as_str(), r.income_tier), r.average_amount))
            .collect()
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.category.as_str()).collect()
    }
}

/// Sampling profile of a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub name: String,
    /// Base draw weight before the tier adjustment
    pub weight: f64,
    /// Essentials are weighted up for lower tiers, discretionary spend for higher ones
    pub essential: bool,
    pub products: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCatalog {
    profiles: Vec<CategoryProfile>,
}

impl CategoryCatalog {
    pub fn new(profiles: Vec<CategoryProfile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[CategoryProfile] {
        &self.profiles
    }

    /// Tier-adjusted draw weights, aligned with `profiles()`.
    ///
    /// With bias `b`, an essential category at tier `t` gets
    /// `weight · (1 + b·(3 - t))`; a discretionary one `weight · (1 + b·(t - 3))`.
    /// Negative results floor at zero.
    pub fn weights_for_tier(&self, tier: u8, bias: f64) -> Vec<f64> {
        let shift = 3.0 - f64::from(tier);
        self.profiles
            .iter()
            .map(|p| {
                let factor = if p.essential {
                    1.0 + bias * shift
                } else {
                    1.0 - bias * shift
                };
                (p.weight * factor).max(0.0)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoWeight {
    pub city: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoWeights {
    rows: Vec<GeoWeight>,
}

impl GeoWeights {
    pub fn new(rows: Vec<GeoWeight>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[GeoWeight] {
        &self.rows
    }
}

/// A holiday or seasonal window in which purchases are more likely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEffect {
    #[serde(default)]
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Relative draw weight of days inside the window (≥ 1)
    pub boost: f64,
}

impl CalendarEffect {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarEffects {
    rows: Vec<CalendarEffect>,
}

impl CalendarEffects {
    pub fn new(rows: Vec<CalendarEffect>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CalendarEffect] {
        &self.rows
    }

    /// Draw weight of a day: the largest boost among windows covering it, else 1
    pub fn boost_on(&self, date: NaiveDate) -> f64 {
        self.rows
            .iter()
            .filter(|e| e.contains(date))
            .map(|e| e.boost)
            .fold(1.0, f64::max)
    }
}

/// Everything the synthesizer consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSource {
    pub statistics: CategoryStatistics,
    pub catalog: CategoryCatalog,
    pub geo_weights: GeoWeights,
    #[serde(default)]
    pub calendar_effects: CalendarEffects,
}

impl AggregateSource {
    /// Built-in survey tables with calendar windows placed in `survey_year`
    pub fn builtin(survey_year: i32) -> Self {
        Self {
            statistics: builtin_statistics(),
            catalog: builtin_catalog(),
            geo_weights: builtin_geo_weights(),
            calendar_effects: builtin_calendar(survey_year),
        }
    }

    /// Load a source from a JSON document with the four tables
    pub fn from_json_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let source: AggregateSource =
            serde_json::from_str(&content).map_err(|e| PipelineError::Format {
                stage: STAGE,
                message: format!("{}: {}", path.display(), e),
            })?;
        debug!(
            "Loaded aggregate source from {} ({} statistics rows)",
            path.display(),
            source.statistics.rows().len()
        );
        Ok(source)
    }

    /// Check every table before any sampling happens
    pub fn validate(&self) -> PipelineResult<()> {
        for row in self.statistics.rows() {
            if !TIERS.contains(&row.income_tier) {
                return Err(PipelineError::config(
                    STAGE,
                    format!(
                        "statistic for '{}' has income tier {} (expected 1-5)",
                        row.category, row.income_tier
                    ),
                ));
            }
            if !row.average_amount.is_finite() || row.average_amount < 0.0 {
                return Err(PipelineError::config(
                    STAGE,
                    format!(
                        "statistic for '{}' tier {} has invalid average {}",
                        row.category, row.income_tier, row.average_amount
                    ),
                ));
            }
        }

        let profiles = self.catalog.profiles();
        if profiles.is_empty() {
            return Err(PipelineError::config(STAGE, "category catalog is empty"));
        }
        check_weights(STAGE, "category", profiles.iter().map(|p| p.weight))?;

        let index = self.statistics.index();
        for profile in profiles {
            if profile.products.is_empty() {
                return Err(PipelineError::config(
                    STAGE,
                    format!("category '{}' lists no products", profile.name),
                ));
            }
            for tier in TIERS {
                if !index.contains_key(&(profile.name.as_str(), tier)) {
                    return Err(PipelineError::config(
                        STAGE,
                        format!("no statistic for category '{}' tier {}", profile.name, tier),
                    ));
                }
            }
        }

        if self.geo_weights.rows().iter().any(|g| !(g.weight > 0.0)) {
            return Err(PipelineError::config(STAGE, "city weights must be > 0"));
        }
        check_weights(STAGE, "city", self.geo_weights.rows().iter().map(|g| g.weight))?;

        for effect in self.calendar_effects.rows() {
            if effect.start > effect.end {
                return Err(PipelineError::config(
                    STAGE,
                    format!("calendar window '{}' ends before it starts", effect.label),
                ));
            }
            if !effect.boost.is_finite() || effect.boost < 1.0 {
                return Err(PipelineError::config(
                    STAGE,
                    format!("calendar window '{}' boost must be ≥ 1", effect.label),
                ));
            }
        }
        Ok(())
    }
}

/// Reject weight vectors that are empty, negative, non-finite or sum to zero
pub(crate) fn check_weights(
    stage: &'static str,
    what: &str,
    weights: impl IntoIterator<Item = f64>,
) -> PipelineResult<()> {
    let mut sum = 0.0;
    let mut count = 0;
    for w in weights {
        if !w.is_finite() || w < 0.0 {
            return Err(PipelineError::config(
                stage,
                format!("{what} weight {w} is not a finite non-negative number"),
            ));
        }
        sum += w;
        count += 1;
    }
    if count == 0 || sum <= 0.0 {
        return Err(PipelineError::config(
            stage,
            format!("{what} weights sum to zero"),
        ));
    }
    Ok(())
}

/// (name, base average per purchase in KRW, draw weight, essential, products)
const CATEGORIES: &[(&str, f64, f64, bool, &[&str])] = &[
    ("Food & non-alcoholic beverages", 28_000.0, 16.0, true,
        &["Rice", "Kimchi", "Fresh produce", "Dairy", "Coffee beans", "Bottled water"]),
    ("Alcoholic beverages & tobacco", 12_000.0, 4.0, false,
        &["Soju", "Beer", "Makgeolli", "Cigarettes"]),
    ("Clothing & footwear", 45_000.0, 7.0, false,
        &["Outerwear", "Sneakers", "Shirts", "Children's clothing"]),
    ("Housing & utilities", 48_000.0, 10.0, true,
        &["Electricity bill", "Gas bill", "Water bill", "Maintenance fee"]),
    ("Household goods & services", 35_000.0, 6.0, false,
        &["Detergent", "Kitchenware", "Bedding", "Cleaning service"]),
    ("Health", 30_000.0, 8.0, true,
        &["Clinic visit", "Prescription", "Vitamins", "Dental care"]),
    ("Transport", 40_000.0, 12.0, true,
        &["Fuel", "Subway pass", "Taxi fare", "Car maintenance"]),
    ("Communication", 25_000.0, 6.0, true,
        &["Mobile plan", "Internet service", "Phone accessory"]),
    ("Recreation & culture", 38_000.0, 9.0, false,
        &["Concert ticket", "Books", "Streaming subscription", "Sports gear"]),
    ("Education", 44_000.0, 6.0, false,
        &["Academy tuition", "Textbooks", "Online course"]),
    ("Restaurants & hotels", 22_000.0, 11.0, false,
        &["Dining out", "Delivery meal", "Cafe", "Hotel stay"]),
    ("Miscellaneous goods & services", 20_000.0, 5.0, false,
        &["Haircut", "Cosmetics", "Insurance premium", "Gift"]),
];

/// Mild within-table tier gradient of the survey averages
const TIER_GRADIENT: [f64; 5] = [0.96, 0.98, 1.0, 1.02, 1.04];

fn builtin_statistics() -> CategoryStatistics {
    let mut rows = Vec::with_capacity(CATEGORIES.len() * TIERS.len());
    for (name, base, _, _, _) in CATEGORIES {
        for (tier, gradient) in TIERS.iter().zip(TIER_GRADIENT) {
            rows.push(CategoryStatistic {
                category: (*name).to_string(),
                income_tier: *tier,
                average_amount: (base * gradient / 10.0).round() * 10.0,
            });
        }
    }
    CategoryStatistics::new(rows)
}

fn builtin_catalog() -> CategoryCatalog {
    CategoryCatalog::new(
        CATEGORIES
            .iter()
            .map(|(name, _, weight, essential, products)| CategoryProfile {
                name: (*name).to_string(),
                weight: *weight,
                essential: *essential,
                products: products.iter().map(|p| (*p).to_string()).collect(),
            })
            .collect(),
    )
}

/// Population in millions
const CITIES: &[(&str, f64)] = &[
    ("서울", 9.4),
    ("부산", 3.3),
    ("인천", 3.0),
    ("대구", 2.4),
    ("대전", 1.4),
    ("광주", 1.4),
    ("수원", 1.2),
    ("울산", 1.1),
    ("창원", 1.0),
    ("세종", 0.4),
];

fn builtin_geo_weights() -> GeoWeights {
    GeoWeights::new(
        CITIES
            .iter()
            .map(|(city, weight)| GeoWeight {
                city: (*city).to_string(),
                weight: *weight,
            })
            .collect(),
    )
}

/// (label, start month/day, end month/day, boost)
const HOLIDAYS: &[(&str, (u32, u32), (u32, u32), f64)] = &[
    ("Lunar New Year", (2, 9), (2, 12), 2.5),
    ("Family month", (5, 1), (5, 8), 1.5),
    ("Chuseok", (9, 14), (9, 18), 2.5),
    ("Year-end", (12, 20), (12, 31), 1.8),
];

fn builtin_calendar(year: i32) -> CalendarEffects {
    CalendarEffects::new(
        HOLIDAYS
            .iter()
            .filter_map(|(label, (sm, sd), (em, ed), boost)| {
                Some(CalendarEffect {
                    label: (*label).to_string(),
                    start: NaiveDate::from_ymd_opt(year, *sm, *sd)?,
                    end: NaiveDate::from_ymd_opt(year, *em, *ed)?,
                    boost: *boost,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_source_is_valid() {
        let source = AggregateSource::builtin(2024);
        assert!(source.validate().is_ok());
        assert_eq!(source.statistics.rows().len(), 12 * 5);
        assert_eq!(source.calendar_effects.rows().len(), 4);
    }

    #[test]
    fn test_tier_weights_favor_essentials_for_low_tiers() {
        let catalog = builtin_catalog();
        let food = catalog
            .profiles()
            .iter()
            .position(|p| p.name.starts_with("Food"))
            .expect("food category");
        let dining = catalog
            .profiles()
            .iter()
            .position(|p| p.name.starts_with("Restaurants"))
            .expect("restaurant category");

        let low = catalog.weights_for_tier(1, 0.15);
        let high = catalog.weights_for_tier(5, 0.15);
        assert!(low[food] > high[food]);
        assert!(low[dining] < high[dining]);
    }

    #[test]
    fn test_missing_statistic_is_configuration_error() {
        let mut source = AggregateSource::builtin(2024);
        let rows: Vec<_> = source
            .statistics
            .rows()
            .iter()
            .filter(|r| !(r.category == "Health" && r.income_tier == 4))
            .cloned()
            .collect();
        source.statistics = CategoryStatistics::new(rows);
        let err = source.validate().expect_err("missing statistic");
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(err.to_string().contains("Health"));
    }

    #[test]
    fn test_zero_city_weights_rejected() {
        let mut source = AggregateSource::builtin(2024);
        source.geo_weights = GeoWeights::new(vec![GeoWeight {
            city: "서울".into(),
            weight: 0.0,
        }]);
        assert!(source.validate().is_err());
    }

    #[test]
    fn test_calendar_boost_uses_max_overlap() {
        let day = |m, d| NaiveDate::from_ymd_opt(2024, m, d).expect("date");
        let effects = CalendarEffects::new(vec![
            CalendarEffect {
                label: "a".into(),
                start: day(1, 1),
                end: day(1, 10),
                boost: 1.5,
            },
            CalendarEffect {
                label: "b".into(),
                start: day(1, 5),
                end: day(1, 6),
                boost: 3.0,
            },
        ]);
        assert_eq!(effects.boost_on(day(1, 2)), 1.5);
        assert_eq!(effects.boost_on(day(1, 5)), 3.0);
        assert_eq!(effects.boost_on(day(2, 1)), 1.0);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut source = AggregateSource::builtin(2024);
        source.calendar_effects = CalendarEffects::new(vec![CalendarEffect {
            label: "bad".into(),
            start: NaiveDate::from_ymd_opt(2024, 3, 2).expect("date"),
            end: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            boost: 2.0,
        }]);
        assert!(source.validate().is_err());
    }
}
