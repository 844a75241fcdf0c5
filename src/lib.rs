//! spendlab - synthetic household spending with a data quality lab
//!
//! Survey aggregates are expanded into individual transactions, degraded
//! with recorded defects, then analyzed, cleaned and analyzed again.
//!
//! ```no_run
//! use spendlab::{Pipeline, PipelineConfig};
//!
//! let outcome = Pipeline::new(PipelineConfig::default()).run()?;
//! println!("{}", outcome.summary().summary());
//! # Ok::<(), spendlab::PipelineError>(())
//! ```

pub mod cleaning;
pub mod cli;
pub mod config;
pub mod dates;
pub mod defects;
pub mod detectors;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
pub mod source;
pub mod stats;
pub mod synth;

pub use cleaning::{CleaningAction, CleaningLog, CleaningLogEntry, QualityCleaner};
pub use config::PipelineConfig;
pub use defects::{DefectInjector, DefectKind, DefectManifest};
pub use detectors::{QualityDetector, QualityReport};
pub use error::{PipelineError, PipelineResult};
pub use models::{Column, Dataset, Status, Transaction};
pub use pipeline::{Pipeline, PipelineOutcome, RunSummary};
pub use source::AggregateSource;
pub use synth::TransactionSynthesizer;
