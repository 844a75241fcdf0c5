//! Append-only record of cleaning actions

use crate::models::Column;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CleaningAction {
    DropRow,
    ImputeNumeric,
    ImputeCategorical,
    Deduplicate,
    CapOutlier,
    StandardizeFormat,
    RepairEncoding,
}

impl CleaningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningAction::DropRow => "DropRow",
            CleaningAction::ImputeNumeric => "ImputeNumeric",
            CleaningAction::ImputeCategorical => "ImputeCategorical",
            CleaningAction::Deduplicate => "Deduplicate",
            CleaningAction::CapOutlier => "CapOutlier",
            CleaningAction::StandardizeFormat => "StandardizeFormat",
            CleaningAction::RepairEncoding => "RepairEncoding",
        }
    }
}

impl fmt::Display for CleaningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningLogEntry {
    pub action: CleaningAction,
    /// `None` for whole-row actions such as deduplication
    pub column: Option<Column>,
    pub affected_row_count: usize,
    /// Imputed value, cap bounds, drop reason and the like
    pub parameters: BTreeMap<String, String>,
}

impl CleaningLogEntry {
    pub fn new(action: CleaningAction, column: Option<Column>, affected_row_count: usize) -> Self {
        Self {
            action,
            column,
            affected_row_count,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    /// One line, e.g. `ImputeNumeric amount: 12 rows (group=Health, value=30600)`
    pub fn describe(&self) -> String {
        let target = self
            .column
            .map(|c| format!(" {}", c))
            .unwrap_or_default();
        let params = if self.parameters.is_empty() {
            String::new()
        } else {
            let joined: Vec<String> = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            format!(" ({})", joined.join(", "))
        };
        format!(
            "{}{}: {} row{}{}",
            self.action,
            target,
            self.affected_row_count,
            if self.affected_row_count == 1 { "" } else { "s" },
            params
        )
    }
}

/// Ordered log of one cleaner run. Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CleaningLog {
    entries: Vec<CleaningLogEntry>,
}

impl CleaningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries that touched no rows are discarded.
    pub fn record(&mut self, entry: CleaningLogEntry) {
        if entry.affected_row_count > 0 {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[CleaningLogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CleaningLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of affected rows across entries with `action`
    pub fn affected(&self, action: CleaningAction) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.affected_row_count)
            .sum()
    }

    pub fn affected_in(&self, action: CleaningAction, column: Column) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == action && e.column == Some(column))
            .map(|e| e.affected_row_count)
            .sum()
    }
}

impl<'a> IntoIterator for &'a CleaningLog {
    type Item = &'a CleaningLogEntry;
    type IntoIter = std::slice::Iter<'a, CleaningLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count_entries_are_discarded() {
        let mut log = CleaningLog::new();
        log.record(CleaningLogEntry::new(CleaningAction::Deduplicate, None, 0));
        assert!(log.is_empty());
        log.record(CleaningLogEntry::new(CleaningAction::Deduplicate, None, 3));
        assert_eq!(log.len(), 1);
        assert_eq!(log.affected(CleaningAction::Deduplicate), 3);
    }

    #[test]
    fn test_describe() {
        let entry = CleaningLogEntry::new(CleaningAction::ImputeNumeric, Some(Column::Amount), 2)
            .with_param("group", "Health")
            .with_param("value", 30_600.0);
        assert_eq!(
            entry.describe(),
            "ImputeNumeric amount: 2 rows (group=Health, value=30600)"
        );
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = CleaningLogEntry::new(CleaningAction::CapOutlier, Some(Column::Amount), 4);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "CapOutlier");
        assert_eq!(json["column"], "amount");
        assert_eq!(json["affectedRowCount"], 4);
    }
}
