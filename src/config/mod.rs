//! Configuration module for spendlab
//!
//! This module handles:
//! - Synthesis, defect, cleaning and scoring options (spendlab.toml)
//! - Eager range validation
//! - The template written by `spendlab init`

mod pipeline_config;

pub use pipeline_config::{
    CleaningConfig,
    DefectConfig,
    PipelineConfig,
    ScoringConfig,
    StatusWeights,
    SynthesisConfig,
    DEFAULT_CONFIG_TOML,
    load_config_file,
    load_pipeline_config,
};
