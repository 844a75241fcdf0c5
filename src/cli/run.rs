//! Run command - the full synthesize/inject/clean pipeline

use super::{check_fail_threshold, emit, ReportArgs};
use crate::config::PipelineConfig;
use crate::io::{save_dataset, write_json};
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::reporters;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub fn run(config: PipelineConfig, report: &ReportArgs, save_dir: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let pipeline = Pipeline::new(config);
    let outcome = pipeline.run()?;
    info!("Pipeline finished in {:.2?}", start.elapsed());

    if let Some(dir) = save_dir {
        save_outcome(dir, &outcome)?;
    }

    let summary = outcome.summary();
    let rendered = reporters::report(&summary, &report.format)?;
    emit(&rendered, report.report.as_deref())?;

    check_fail_threshold(report.fail_under, summary.final_report());
    Ok(())
}

/// Write every intermediate artifact of a run into `dir`
fn save_outcome(dir: &Path, outcome: &PipelineOutcome) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    save_dataset(&dir.join("synthesized.json"), &outcome.synthesized)?;
    save_dataset(&dir.join("degraded.json"), &outcome.degraded)?;
    save_dataset(&dir.join("cleaned.json"), &outcome.cleaned)?;
    write_json(&dir.join("manifest.json"), &outcome.manifest)?;
    write_json(&dir.join("cleaning_log.json"), &outcome.log)?;
    eprintln!("Datasets written to {}", dir.display());
    Ok(())
}
