//! Weighted-penalty quality scorer

use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Defect dimensions measured by the detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreInputs {
    /// Missing cells / total cells
    pub missing_ratio: f64,
    /// Duplicate rows / rows
    pub duplicate_ratio: f64,
    /// Rows with an outlier in any numeric column / rows
    pub outlier_ratio: f64,
    pub format_inconsistent: bool,
    pub encoding_issues: bool,
    /// Rows with an out-of-range tier or amount / rows
    pub invalid_ratio: f64,
}

/// One penalty term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub name: String,
    /// Ratio for proportional terms; 1.0 or 0.0 for flat ones
    pub measure: f64,
    pub weight: f64,
    pub points: f64,
}

/// Complete score breakdown for transparency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Clamped to [0, 100]
    pub score: f64,
    pub grade: String,
    pub penalties: Vec<Penalty>,
}

impl ScoreBreakdown {
    pub fn total_penalty(&self) -> f64 {
        self.penalties.iter().map(|p| p.points).sum()
    }

    /// Flat `name → points` view for reports
    pub fn penalty_map(&self) -> BTreeMap<String, f64> {
        self.penalties
            .iter()
            .map(|p| (p.name.clone(), p.points))
            .collect()
    }
}

pub struct QualityScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> QualityScorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, inputs: &ScoreInputs) -> ScoreBreakdown {
        let c = self.config;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let terms = [
            ("missing", inputs.missing_ratio, c.missing_weight),
            ("duplicate", inputs.duplicate_ratio, c.duplicate_weight),
            ("outlier", inputs.outlier_ratio, c.outlier_weight),
            ("format", flag(inputs.format_inconsistent), c.format_penalty),
            ("encoding", flag(inputs.encoding_issues), c.encoding_penalty),
            ("invalid", inputs.invalid_ratio, c.invalid_weight),
        ];

        let penalties: Vec<Penalty> = terms
            .iter()
            .map(|&(name, measure, weight)| Penalty {
                name: name.to_string(),
                measure,
                weight,
                points: measure * weight,
            })
            .collect();

        let total: f64 = penalties.iter().map(|p| p.points).sum();
        let score = (100.0 - total).clamp(0.0, 100.0);
        debug!("Quality score {:.2} (penalty {:.2})", score, total);

        ScoreBreakdown {
            score,
            grade: grade_from_score(score).to_string(),
            penalties,
        }
    }

    /// Human-readable explanation of the score
    pub fn explain(&self, breakdown: &ScoreBreakdown) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "# Quality Score: {:.1} ({})\n",
            breakdown.score, breakdown.grade
        ));
        lines.push("```".to_string());
        lines.push(
            "Score = 100 - (missing × W₁ + duplicate × W₂ + outlier × W₃ + invalid × W₄ + format + encoding)"
                .to_string(),
        );
        lines.push("```\n".to_string());
        for p in &breakdown.penalties {
            if p.points > 0.0 {
                lines.push(format!(
                    "- **{}**: {:.4} × {:.1} = -{:.2}",
                    p.name, p.measure, p.weight, p.points
                ));
            }
        }
        if breakdown.total_penalty() == 0.0 {
            lines.push("- No penalties".to_string());
        }
        lines.join("\n")
    }
}

pub fn grade_from_score(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "F",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_data_scores_100() {
        let config = ScoringConfig::default();
        let b = QualityScorer::new(&config).calculate(&ScoreInputs::default());
        assert_eq!(b.score, 100.0);
        assert_eq!(b.grade, "A");
        assert_eq!(b.total_penalty(), 0.0);
    }

    #[test]
    fn test_default_weights() {
        let config = ScoringConfig::default();
        let b = QualityScorer::new(&config).calculate(&ScoreInputs {
            missing_ratio: 0.1,
            duplicate_ratio: 0.05,
            outlier_ratio: 0.02,
            format_inconsistent: true,
            encoding_issues: false,
            invalid_ratio: 0.0,
        });
        // 3 + 1 + 0.4 + 15
        assert!((b.score - 80.6).abs() < 1e-9);
        assert_eq!(b.grade, "B");
        assert_eq!(b.penalty_map()["format"], 15.0);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let config = ScoringConfig {
            format_penalty: 80.0,
            encoding_penalty: 80.0,
            ..Default::default()
        };
        let b = QualityScorer::new(&config).calculate(&ScoreInputs {
            format_inconsistent: true,
            encoding_issues: true,
            ..Default::default()
        });
        assert_eq!(b.score, 0.0);
        assert_eq!(b.grade, "F");
    }

    #[test]
    fn test_monotone_in_each_dimension() {
        let config = ScoringConfig::default();
        let scorer = QualityScorer::new(&config);
        let base = ScoreInputs {
            missing_ratio: 0.02,
            duplicate_ratio: 0.02,
            outlier_ratio: 0.02,
            ..Default::default()
        };
        let s0 = scorer.calculate(&base).score;
        for worse in [
            ScoreInputs { missing_ratio: 0.2, ..base },
            ScoreInputs { duplicate_ratio: 0.2, ..base },
            ScoreInputs { outlier_ratio: 0.2, ..base },
            ScoreInputs { format_inconsistent: true, ..base },
            ScoreInputs { encoding_issues: true, ..base },
            ScoreInputs { invalid_ratio: 0.2, ..base },
        ] {
            assert!(scorer.calculate(&worse).score < s0);
        }
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade_from_score(90.0), "A");
        assert_eq!(grade_from_score(89.9), "B");
        assert_eq!(grade_from_score(60.0), "D");
        assert_eq!(grade_from_score(59.9), "F");
    }

    #[test]
    fn test_explain_lists_nonzero_terms() {
        let config = ScoringConfig::default();
        let scorer = QualityScorer::new(&config);
        let b = scorer.calculate(&ScoreInputs {
            encoding_issues: true,
            ..Default::default()
        });
        let text = scorer.explain(&b);
        assert!(text.contains("encoding"));
        assert!(!text.contains("**missing**"));
    }
}
