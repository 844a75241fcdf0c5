//! Ground-truth record of injected defects
//!
//! Test oracles only. The detector never reads the manifest.

use crate::models::Column;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Defect classes the injector can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    MissingValue,
    Outlier,
    FormatVariant,
    EncodingCorruption,
    Duplicate,
}

impl DefectKind {
    pub fn all() -> &'static [DefectKind] {
        &[
            DefectKind::MissingValue,
            DefectKind::Outlier,
            DefectKind::FormatVariant,
            DefectKind::EncodingCorruption,
            DefectKind::Duplicate,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DefectKind::MissingValue => "missing_value",
            DefectKind::Outlier => "outlier",
            DefectKind::FormatVariant => "format_variant",
            DefectKind::EncodingCorruption => "encoding_corruption",
            DefectKind::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One altered cell, or one appended row for duplicates (`column` is `None`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectRecord {
    /// Row index in the degraded dataset
    pub row: usize,
    pub column: Option<Column>,
    pub kind: DefectKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectManifest {
    records: Vec<DefectRecord>,
}

impl DefectManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: usize, column: Option<Column>, kind: DefectKind) {
        self.records.push(DefectRecord { row, column, kind });
    }

    pub fn records(&self) -> &[DefectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: DefectKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn count_for(&self, kind: DefectKind, column: Column) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.column == Some(column))
            .count()
    }

    pub fn contains(&self, row: usize, column: Option<Column>, kind: DefectKind) -> bool {
        self.records
            .iter()
            .any(|r| r.row == row && r.column == column && r.kind == kind)
    }

    /// Count per defect class; classes with no records are omitted
    pub fn summary(&self) -> BTreeMap<DefectKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kind).or_insert(0) += 1;
        }
        counts
    }
}
