//! Dataset files
//!
//! A dataset is stored as a JSON array of transaction objects. Every object
//! must carry every column key (`null` is fine); a record without one is a
//! structural problem, not a row-level defect.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Column, Dataset};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

const STAGE: &str = "load";

/// Parse a dataset from JSON text
pub fn parse_dataset(content: &str) -> PipelineResult<Dataset> {
    let value: Value = serde_json::from_str(content).map_err(|e| format_error(e.to_string()))?;
    let records = value
        .as_array()
        .ok_or_else(|| format_error("expected a JSON array of records".to_string()))?;

    for (i, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| format_error(format!("record {i} is not an object")))?;
        if let Some(column) = Column::all().iter().find(|c| !object.contains_key(c.name())) {
            return Err(PipelineError::schema(STAGE, column.name()));
        }
    }

    serde_json::from_value(value).map_err(|e| format_error(e.to_string()))
}

pub fn load_dataset(path: &Path) -> PipelineResult<Dataset> {
    let content = std::fs::read_to_string(path)?;
    let dataset = parse_dataset(&content)?;
    debug!("Loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Write any serializable value as pretty JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipelineResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PipelineError::Format {
        stage: "save",
        message: e.to_string(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn save_dataset(path: &Path, dataset: &Dataset) -> PipelineResult<()> {
    write_json(path, dataset)
}

fn format_error(message: String) -> PipelineError {
    PipelineError::Format {
        stage: STAGE,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_row;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let mut row = sample_row(1);
        row.amount = None;
        let ds = Dataset::new(vec![row, sample_row(2)]);

        save_dataset(&path, &ds).unwrap();
        assert_eq!(load_dataset(&path).unwrap(), ds);
    }

    #[test]
    fn test_absent_column_is_schema_error() {
        let content = r#"[{"id": 1, "income_tier": 2, "category": "Food", "product": "Rice",
            "amount": 100.0, "date": "2024-01-01", "status": "completed"}]"#;
        match parse_dataset(content).unwrap_err() {
            PipelineError::Schema { stage, column } => {
                assert_eq!(stage, "load");
                assert_eq!(column, "city");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_values_are_accepted() {
        let content = r#"[{"id": 1, "income_tier": null, "category": null, "product": null,
            "amount": null, "date": null, "city": null, "status": null}]"#;
        let ds = parse_dataset(content).unwrap();
        assert!(ds.rows()[0].is_missing(Column::Amount));
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            parse_dataset(r#"{"rows": []}"#),
            Err(PipelineError::Format { .. })
        ));
    }
}
