//! CLI command definitions and handlers

mod init;
mod run;
mod stages;

use crate::config::{load_config_file, load_pipeline_config, PipelineConfig};
use crate::detectors::QualityReport;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a rate in [0, 1]
fn parse_rate(s: &str) -> Result<f64, String> {
    let r: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&r) {
        Ok(r)
    } else {
        Err(format!("rate {} is outside [0, 1]", r))
    }
}

/// spendlab - synthetic household spending with a data quality lab
#[derive(Parser, Debug)]
#[command(name = "spendlab")]
#[command(
    version,
    about = "Synthesize household spending transactions, inject realistic defects, then detect, repair and score data quality",
    long_about = "spendlab expands survey aggregates (average spend per category and income \
tier, city weights, holiday windows) into individual synthetic transactions, degrades \
them with configurable defects, and runs a detector and a cleaner over the result.\n\n\
Every random draw is seeded, so the same configuration always yields the same data.\n\n\
Run without a subcommand to execute the full pipeline:\n  \
spendlab",
    after_help = "\
Examples:
  spendlab                                   Full pipeline with defaults (1000 rows, seed 42)
  spendlab run --rows 5000 --format json     JSON summary for scripting
  spendlab synthesize -o clean.json          Write a clean dataset
  spendlab inject clean.json -o dirty.json   Degrade an existing dataset
  spendlab analyze dirty.json                Score a dataset
  spendlab clean dirty.json -o fixed.json    Repair a dataset and print the log"
)]
pub struct Cli {
    /// Directory searched for spendlab.toml / .spendlabrc.json
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Explicit config file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, default_value = "8", value_parser = parse_workers)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Synthesis overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SynthArgs {
    /// Number of transactions to synthesize
    #[arg(long, short = 'n')]
    pub rows: Option<usize>,

    /// Seed for every random draw
    #[arg(long, short = 's')]
    pub seed: Option<u64>,
}

/// Defect rate overrides, each in [0, 1]
#[derive(Args, Debug, Clone, Default)]
pub struct DefectArgs {
    #[arg(long, value_parser = parse_rate)]
    pub missing: Option<f64>,

    #[arg(long, value_parser = parse_rate)]
    pub duplicate: Option<f64>,

    #[arg(long, value_parser = parse_rate)]
    pub outlier: Option<f64>,

    #[arg(long, value_parser = parse_rate)]
    pub format_variant: Option<f64>,

    #[arg(long, value_parser = parse_rate)]
    pub encoding: Option<f64>,

    /// Disable every defect class (explicit rates still apply)
    #[arg(long)]
    pub no_defects: bool,
}

/// Report rendering options
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Output format: text, json, markdown (or md)
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "markdown", "md"])]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Exit with code 1 when the final score is below this value
    #[arg(long)]
    pub fail_under: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a spendlab.toml with every option and its default
    Init {
        /// Overwrite an existing spendlab.toml
        #[arg(long)]
        force: bool,
    },

    /// Synthesize, inject, analyze, clean, and analyze again
    #[command(after_help = "\
Examples:
  spendlab run                                   Defaults: 1000 rows, seed 42
  spendlab run --seed 7 --missing 0.1            Override seed and missing rate
  spendlab run --format markdown --report q.md   Markdown report to a file
  spendlab run --save-dir out/                   Also write every intermediate dataset
  spendlab run --fail-under 95                   Exit 1 if the cleaned score is below 95")]
    Run {
        #[command(flatten)]
        synth: SynthArgs,

        #[command(flatten)]
        defects: DefectArgs,

        /// Column whose absence drops a row
        #[arg(long)]
        critical_column: Option<String>,

        #[command(flatten)]
        report: ReportArgs,

        /// Directory for clean/degraded/cleaned datasets, manifest and log
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Write a clean synthetic dataset
    Synthesize {
        #[command(flatten)]
        synth: SynthArgs,

        /// Aggregate source JSON (default: built-in survey tables)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output dataset path
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Degrade a dataset and record what was changed
    Inject {
        /// Input dataset
        input: PathBuf,

        /// Output dataset path
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Seed for defect selection
        #[arg(long, short = 's')]
        seed: Option<u64>,

        #[command(flatten)]
        defects: DefectArgs,

        /// Also write the defect manifest here
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Score a dataset
    Analyze {
        /// Input dataset
        input: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Repair a dataset and print the cleaning log
    Clean {
        /// Input dataset
        input: PathBuf,

        /// Output dataset path
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Column whose absence drops a row
        #[arg(long)]
        critical_column: Option<String>,

        #[command(flatten)]
        report: ReportArgs,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.workers)
        .build_global()
    {
        debug!("Thread pool already initialized: {}", e);
    }

    match cli.command {
        Some(Commands::Init { force }) => init::run(&cli.dir, force),

        Some(Commands::Run {
            synth,
            defects,
            critical_column,
            report,
            save_dir,
        }) => {
            let mut config = resolve_config(&cli.dir, cli.config.as_deref())?;
            synth.apply(&mut config);
            defects.apply(&mut config);
            if let Some(column) = critical_column {
                config.cleaning.critical_column = column;
            }
            run::run(config, &report, save_dir.as_deref())
        }

        Some(Commands::Synthesize { synth, source, output }) => {
            let mut config = resolve_config(&cli.dir, cli.config.as_deref())?;
            synth.apply(&mut config);
            stages::synthesize(&config, source.as_deref(), &output)
        }

        Some(Commands::Inject {
            input,
            output,
            seed,
            defects,
            manifest,
        }) => {
            let mut config = resolve_config(&cli.dir, cli.config.as_deref())?;
            if let Some(seed) = seed {
                config.synthesis.seed = seed;
            }
            defects.apply(&mut config);
            stages::inject(&config, &input, &output, manifest.as_deref())
        }

        Some(Commands::Analyze { input, report }) => {
            let config = resolve_config(&cli.dir, cli.config.as_deref())?;
            stages::analyze(&config, &input, &report)
        }

        Some(Commands::Clean {
            input,
            output,
            critical_column,
            report,
        }) => {
            let mut config = resolve_config(&cli.dir, cli.config.as_deref())?;
            if let Some(column) = critical_column {
                config.cleaning.critical_column = column;
            }
            stages::clean(&config, &input, &output, &report)
        }

        None => {
            let config = resolve_config(&cli.dir, cli.config.as_deref())?;
            let report = ReportArgs {
                format: "text".to_string(),
                report: None,
                fail_under: None,
            };
            run::run(config, &report, None)
        }
    }
}

impl SynthArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(rows) = self.rows {
            config.synthesis.rows = rows;
        }
        if let Some(seed) = self.seed {
            config.synthesis.seed = seed;
        }
    }
}

impl DefectArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        let d = &mut config.defects;
        if self.no_defects {
            d.missing = 0.0;
            d.duplicate = 0.0;
            d.outlier = 0.0;
            d.format_variant = 0.0;
            d.encoding = 0.0;
        }
        if let Some(r) = self.missing {
            d.missing = r;
        }
        if let Some(r) = self.duplicate {
            d.duplicate = r;
        }
        if let Some(r) = self.outlier {
            d.outlier = r;
        }
        if let Some(r) = self.format_variant {
            d.format_variant = r;
        }
        if let Some(r) = self.encoding {
            d.encoding = r;
        }
    }
}

/// Explicit file if given, otherwise discovery in `dir`
fn resolve_config(dir: &Path, explicit: Option<&Path>) -> Result<PipelineConfig> {
    match explicit {
        Some(path) => load_config_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(load_pipeline_config(dir)),
    }
}

/// Print to stdout, or write to `path` and note it on stderr
fn emit(rendered: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Exit 1 when the score misses the threshold
fn check_fail_threshold(fail_under: Option<f64>, report: &QualityReport) {
    if let Some(threshold) = fail_under {
        if report.score < threshold {
            eprintln!(
                "Failing: score {:.1} is below --fail-under={}",
                report.score, threshold
            );
            std::process::exit(1);
        }
    }
}
