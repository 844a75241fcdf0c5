//! Single-stage commands: synthesize, inject, analyze, clean

use super::{check_fail_threshold, emit, ReportArgs};
use crate::cleaning::QualityCleaner;
use crate::config::PipelineConfig;
use crate::defects::DefectInjector;
use crate::detectors::QualityDetector;
use crate::io::{load_dataset, save_dataset, write_json};
use crate::pipeline::RunSummary;
use crate::reporters;
use crate::source::AggregateSource;
use crate::synth::TransactionSynthesizer;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub fn synthesize(config: &PipelineConfig, source: Option<&Path>, output: &Path) -> Result<()> {
    config.validate()?;
    let source = match source {
        Some(path) => AggregateSource::from_json_file(path)
            .with_context(|| format!("Failed to load aggregate source {}", path.display()))?,
        None => AggregateSource::builtin(config.synthesis.survey_year),
    };
    let s = &config.synthesis;
    let dataset = TransactionSynthesizer::new(&source, s)?.synthesize(s.rows, s.seed)?;
    save_dataset(output, &dataset)?;
    println!(
        "{} Synthesized {} transactions (seed {}) to {}",
        style("✓").green(),
        dataset.len(),
        s.seed,
        style(output.display()).cyan()
    );
    Ok(())
}

pub fn inject(
    config: &PipelineConfig,
    input: &Path,
    output: &Path,
    manifest_path: Option<&Path>,
) -> Result<()> {
    config.validate()?;
    let dataset = load_dataset(input)
        .with_context(|| format!("Failed to load dataset {}", input.display()))?;
    let injector = DefectInjector::new(config.defects.clone())?;
    let (degraded, manifest) = injector.inject(&dataset, config.synthesis.seed);

    save_dataset(output, &degraded)?;
    if let Some(path) = manifest_path {
        write_json(path, &manifest)?;
    }

    println!(
        "{} Injected {} defects into {} rows, wrote {}",
        style("✓").green(),
        manifest.len(),
        dataset.len(),
        style(output.display()).cyan()
    );
    for (kind, count) in manifest.summary() {
        println!("  {:<20} {}", kind, count);
    }
    Ok(())
}

pub fn analyze(config: &PipelineConfig, input: &Path, report: &ReportArgs) -> Result<()> {
    config.validate()?;
    let dataset = load_dataset(input)
        .with_context(|| format!("Failed to load dataset {}", input.display()))?;
    let quality = QualityDetector::new(config.scoring.clone()).analyze(&dataset);
    let summary = RunSummary::from_report(quality);

    let rendered = reporters::report(&summary, &report.format)?;
    emit(&rendered, report.report.as_deref())?;
    check_fail_threshold(report.fail_under, summary.final_report());
    Ok(())
}

pub fn clean(
    config: &PipelineConfig,
    input: &Path,
    output: &Path,
    report: &ReportArgs,
) -> Result<()> {
    config.validate()?;
    let dataset = load_dataset(input)
        .with_context(|| format!("Failed to load dataset {}", input.display()))?;
    let detector = QualityDetector::new(config.scoring.clone());
    let before = detector.analyze(&dataset);
    let (cleaned, log) = QualityCleaner::new(&config.cleaning).clean(&dataset)?;
    let after = detector.analyze(&cleaned);

    save_dataset(output, &cleaned)?;
    eprintln!("Cleaned dataset written to {}", output.display());

    let summary = RunSummary::from_cleaning(before, log, after);
    let rendered = reporters::report(&summary, &report.format)?;
    emit(&rendered, report.report.as_deref())?;
    check_fail_threshold(report.fail_under, summary.final_report());
    Ok(())
}
