//! End-to-end pipeline
//!
//! Orchestrates the staged run:
//! 1. Validate configuration (fails before any sampling)
//! 2. Synthesize transactions from the aggregate source
//! 3. Inject defects
//! 4. Analyze the degraded dataset
//! 5. Clean it
//! 6. Analyze the cleaned dataset
//!
//! Each stage takes its input by reference and returns a new value, so the
//! outcome keeps every intermediate dataset.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cleaning::{CleaningLog, QualityCleaner};
use crate::config::PipelineConfig;
use crate::defects::{DefectInjector, DefectKind, DefectManifest};
use crate::detectors::{QualityDetector, QualityReport};
use crate::error::PipelineResult;
use crate::models::Dataset;
use crate::source::AggregateSource;
use crate::synth::TransactionSynthesizer;

/// Full synthesis and quality pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    source: AggregateSource,
}

impl Pipeline {
    /// Pipeline over the built-in survey tables for the configured year.
    pub fn new(config: PipelineConfig) -> Self {
        let source = AggregateSource::builtin(config.synthesis.survey_year);
        Self { config, source }
    }

    /// Use a different aggregate source.
    pub fn with_source(mut self, source: AggregateSource) -> Self {
        self.source = source;
        self
    }

    /// Override the seed for every random stage.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.synthesis.seed = seed;
        self
    }

    /// Override the number of synthesized rows.
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.config.synthesis.rows = rows;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn source(&self) -> &AggregateSource {
        &self.source
    }

    pub fn synthesize(&self) -> PipelineResult<Dataset> {
        let s = &self.config.synthesis;
        TransactionSynthesizer::new(&self.source, s)?.synthesize(s.rows, s.seed)
    }

    pub fn inject(&self, dataset: &Dataset) -> PipelineResult<(Dataset, DefectManifest)> {
        let injector = DefectInjector::new(self.config.defects.clone())?;
        Ok(injector.inject(dataset, self.config.synthesis.seed))
    }

    pub fn analyze(&self, dataset: &Dataset) -> QualityReport {
        QualityDetector::new(self.config.scoring.clone()).analyze(dataset)
    }

    pub fn clean(&self, dataset: &Dataset) -> PipelineResult<(Dataset, CleaningLog)> {
        QualityCleaner::new(&self.config.cleaning).clean(dataset)
    }

    /// Run every stage.
    pub fn run(&self) -> PipelineResult<PipelineOutcome> {
        self.config.validate()?;
        self.source.validate()?;

        let synthesized = self.synthesize()?;
        let (degraded, manifest) = self.inject(&synthesized)?;
        let before = self.analyze(&degraded);
        let (cleaned, log) = self.clean(&degraded)?;
        let after = self.analyze(&cleaned);

        let outcome = PipelineOutcome {
            seed: self.config.synthesis.seed,
            synthesized,
            degraded,
            manifest,
            before,
            cleaned,
            log,
            after,
        };
        info!("Pipeline complete: {}", outcome.summary().summary());
        Ok(outcome)
    }
}

/// Every intermediate value of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub seed: u64,
    pub synthesized: Dataset,
    pub degraded: Dataset,
    pub manifest: DefectManifest,
    pub before: QualityReport,
    pub cleaned: Dataset,
    pub log: CleaningLog,
    pub after: QualityReport,
}

impl PipelineOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            seed: Some(self.seed),
            rows_synthesized: Some(self.synthesized.len()),
            defects: self.manifest.summary(),
            before: self.before.clone(),
            after: Some(self.after.clone()),
            cleaning_log: Some(self.log.clone()),
        }
    }
}

/// What reporters render: a report, optionally with the cleaning that
/// followed it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_synthesized: Option<usize>,
    /// Injected defects per class
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub defects: BTreeMap<DefectKind, usize>,
    pub before: QualityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<QualityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning_log: Option<CleaningLog>,
}

impl RunSummary {
    /// A standalone analysis
    pub fn from_report(report: QualityReport) -> Self {
        Self {
            seed: None,
            rows_synthesized: None,
            defects: BTreeMap::new(),
            before: report,
            after: None,
            cleaning_log: None,
        }
    }

    /// An analysis followed by cleaning
    pub fn from_cleaning(before: QualityReport, log: CleaningLog, after: QualityReport) -> Self {
        Self {
            after: Some(after),
            cleaning_log: Some(log),
            ..Self::from_report(before)
        }
    }

    /// Report the run is judged by: after cleaning when present
    pub fn final_report(&self) -> &QualityReport {
        self.after.as_ref().unwrap_or(&self.before)
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} rows scored {:.1} ({})",
            self.before.row_count, self.before.score, self.before.grade
        )];
        if let Some(log) = &self.cleaning_log {
            parts.push(format!("{} cleaning actions", log.len()));
        }
        if let Some(after) = &self.after {
            parts.push(format!(
                "{} rows scored {:.1} ({})",
                after.row_count, after.score, after.grade
            ));
        }
        parts.join(" → ")
    }
}
