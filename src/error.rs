//! Fatal pipeline errors
//!
//! Only configuration and schema problems are errors. Row-level anomalies
//! (nulls, duplicates, outliers, bad encodings) are data: they show up as
//! counts in a `QualityReport` or entries in a `CleaningLog`.

use thiserror::Error;

/// Errors that abort a pipeline invocation
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[{stage}] invalid configuration: {message}")]
    Configuration { stage: &'static str, message: String },

    #[error("[{stage}] required column '{column}' is absent")]
    Schema { stage: &'static str, column: String },

    #[error("[{stage}] malformed dataset: {message}")]
    Format { stage: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(stage: &'static str, message: impl Into<String>) -> Self {
        PipelineError::Configuration {
            stage,
            message: message.into(),
        }
    }

    pub fn schema(stage: &'static str, column: impl Into<String>) -> Self {
        PipelineError::Schema {
            stage,
            column: column.into(),
        }
    }

    /// Stage in which the error surfaced, if known
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            PipelineError::Configuration { stage, .. }
            | PipelineError::Schema { stage, .. }
            | PipelineError::Format { stage, .. } => Some(*stage),
            PipelineError::Io(_) => None,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = PipelineError::schema("clean", "customer_id");
        assert_eq!(err.stage(), Some("clean"));
        assert_eq!(
            err.to_string(),
            "[clean] required column 'customer_id' is absent"
        );

        let err = PipelineError::config("config", "rows must be at least 1");
        assert!(err.to_string().contains("rows must be at least 1"));
    }
}
