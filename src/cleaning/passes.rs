//! Individual cleaning passes
//!
//! Each pass mutates the working rows in place and appends to the log.
//! Row-level problems never raise: an unrecoverable row is dropped and the
//! drop is logged.

use super::log::{CleaningAction, CleaningLog, CleaningLogEntry};
use crate::dates::{canonical, parse_any, DateFormat};
use crate::defects::encoding::{looks_corrupted, reverse_misdecode};
use crate::models::{Column, Transaction};
use crate::stats::{median, mode, IqrBounds};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::debug;

type GroupKey = Option<String>;

const NO_GROUP: &str = "(none)";

fn group_key(row: &Transaction) -> GroupKey {
    row.categorical(Column::Category)
}

fn group_label(key: &GroupKey) -> &str {
    key.as_deref().unwrap_or(NO_GROUP)
}

/// Pass 1: drop rows missing the critical column
pub(super) fn drop_missing_critical(
    rows: &mut Vec<Transaction>,
    column: Column,
    log: &mut CleaningLog,
) {
    let before = rows.len();
    rows.retain(|r| !r.is_missing(column));
    log.record(
        CleaningLogEntry::new(CleaningAction::DropRow, Some(column), before - rows.len())
            .with_param("reason", "missing critical value"),
    );
}

/// Pass 1b: drop rows holding a value outside its column's range.
///
/// A row out of range in several columns is counted once, under the first.
pub(super) fn drop_out_of_range(rows: &mut Vec<Transaction>, log: &mut CleaningLog) {
    for &column in Column::range_checked() {
        let before = rows.len();
        rows.retain(|r| !r.is_out_of_range(column));
        let allowed = match column {
            Column::IncomeTier => "1-5",
            _ => "finite, >= 0",
        };
        log.record(
            CleaningLogEntry::new(CleaningAction::DropRow, Some(column), before - rows.len())
                .with_param("reason", "out of range")
                .with_param("allowed", allowed),
        );
    }
}

/// Pass 2: fill numeric nulls with the median of the row's category,
/// falling back to the column median
pub(super) fn impute_numeric(rows: &mut Vec<Transaction>, log: &mut CleaningLog) {
    for &column in Column::numeric() {
        if !rows.iter().any(|r| r.is_missing(column)) {
            continue;
        }

        let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
        for row in rows.iter() {
            if let Some(v) = row.numeric(column) {
                groups.entry(group_key(row)).or_default().push(v);
            }
        }
        let all: Vec<f64> = groups.values().flatten().copied().collect();
        let global = median(&all);
        let medians: BTreeMap<GroupKey, f64> = groups
            .into_par_iter()
            .filter_map(|(key, values)| median(&values).map(|m| (key, m)))
            .collect();

        // (value, fallback used, rows filled)
        let mut filled: BTreeMap<GroupKey, (f64, bool, usize)> = BTreeMap::new();
        let mut unresolved = 0;
        rows.retain_mut(|row| {
            if !row.is_missing(column) {
                return true;
            }
            let key = group_key(row);
            let choice = match medians.get(&key) {
                Some(&m) => Some((m, false)),
                None => global.map(|g| (g, true)),
            };
            match choice {
                Some((value, fallback)) => {
                    row.set_numeric(column, value);
                    filled.entry(key).or_insert((value, fallback, 0)).2 += 1;
                    true
                }
                None => {
                    unresolved += 1;
                    false
                }
            }
        });

        for (key, (value, fallback, count)) in &filled {
            log.record(
                CleaningLogEntry::new(CleaningAction::ImputeNumeric, Some(column), *count)
                    .with_param("group", group_label(key))
                    .with_param("value", value)
                    .with_param(
                        "strategy",
                        if *fallback { "global median" } else { "group median" },
                    ),
            );
        }
        log.record(
            CleaningLogEntry::new(CleaningAction::DropRow, Some(column), unresolved)
                .with_param("reason", "no value to impute from"),
        );
    }
}

/// Pass 3: fill categorical nulls with the group mode.
///
/// `category` is imputed first from the global mode; later columns group by
/// the (now complete) category. Ties resolve to the smallest value.
pub(super) fn impute_categorical(rows: &mut Vec<Transaction>, log: &mut CleaningLog) {
    for &column in Column::categorical() {
        if !rows.iter().any(|r| r.is_missing(column)) {
            continue;
        }
        let grouped = column != Column::Category;
        let key_of = |row: &Transaction| if grouped { group_key(row) } else { None };

        let mut groups: BTreeMap<GroupKey, Vec<String>> = BTreeMap::new();
        for row in rows.iter() {
            if let Some(v) = row.categorical(column) {
                groups.entry(key_of(row)).or_default().push(v);
            }
        }
        let global = mode(groups.values().flatten().map(String::as_str));
        let modes: BTreeMap<GroupKey, String> = groups
            .par_iter()
            .filter_map(|(key, values)| {
                mode(values.iter().map(String::as_str)).map(|m| (key.clone(), m))
            })
            .collect();

        let mut filled: BTreeMap<GroupKey, (String, bool, usize)> = BTreeMap::new();
        let mut unresolved = 0;
        rows.retain_mut(|row| {
            if !row.is_missing(column) {
                return true;
            }
            let key = key_of(row);
            let choice = match modes.get(&key) {
                Some(m) => Some((m.clone(), !grouped)),
                None => global.clone().map(|g| (g, true)),
            };
            match choice {
                Some((value, fallback)) if row.set_categorical(column, &value) => {
                    filled.entry(key).or_insert((value, fallback, 0)).2 += 1;
                    true
                }
                _ => {
                    unresolved += 1;
                    false
                }
            }
        });

        for (key, (value, fallback, count)) in &filled {
            let mut entry =
                CleaningLogEntry::new(CleaningAction::ImputeCategorical, Some(column), *count)
                    .with_param("value", value)
                    .with_param("strategy", if *fallback { "global mode" } else { "group mode" });
            if grouped {
                entry = entry.with_param("group", group_label(key));
            }
            log.record(entry);
        }
        log.record(
            CleaningLogEntry::new(CleaningAction::DropRow, Some(column), unresolved)
                .with_param("reason", "no value to impute from"),
        );
    }
}

/// Pass 4: keep the first occurrence of each exact row
pub(super) fn deduplicate(rows: &mut Vec<Transaction>, log: &mut CleaningLog) {
    let before = rows.len();
    let mut seen = FxHashSet::default();
    rows.retain(|r| seen.insert(r.row_key()));
    log.record(
        CleaningLogEntry::new(CleaningAction::Deduplicate, None, before - rows.len())
            .with_param("keep", "first"),
    );
}

/// Pass 5: clamp numeric values to freshly computed IQR fences
pub(super) fn cap_outliers(rows: &mut [Transaction], log: &mut CleaningLog) {
    for &column in Column::numeric() {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.numeric(column)).collect();
        let Some(bounds) = IqrBounds::from_values(&values) else {
            continue;
        };
        let mut capped = 0;
        for row in rows.iter_mut() {
            if let Some(v) = row.numeric(column) {
                if !bounds.contains(v) {
                    row.set_numeric(column, bounds.cap(v));
                    capped += 1;
                }
            }
        }
        log.record(
            CleaningLogEntry::new(CleaningAction::CapOutlier, Some(column), capped)
                .with_param("lower", bounds.lower)
                .with_param("upper", bounds.upper)
                .with_param("q1", bounds.q1)
                .with_param("q3", bounds.q3),
        );
    }
}

/// Pass 6: rewrite dates in canonical form. Returns rows dropped.
///
/// Values are tried against each bucket in precedence order; a value no
/// bucket accepts is dropped, never guessed.
pub(super) fn standardize_formats(rows: &mut Vec<Transaction>, log: &mut CleaningLog) -> usize {
    let before = rows.len();
    for &column in Column::date_like() {
        let mut converted: BTreeMap<DateFormat, usize> = BTreeMap::new();
        let mut missing = 0;
        let mut unparseable = 0;

        rows.retain_mut(|row| {
            let parsed = row
                .text(column)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (v.to_string(), parse_any(v)));
            match parsed {
                None => {
                    missing += 1;
                    false
                }
                Some((_, None)) => {
                    unparseable += 1;
                    false
                }
                Some((original, Some((format, date)))) => {
                    let canon = canonical(date);
                    if canon != original {
                        if let Some(slot) = row.text_slot(column) {
                            *slot = Some(canon);
                        }
                        *converted.entry(format).or_insert(0) += 1;
                    }
                    true
                }
            }
        });

        let total: usize = converted.values().sum();
        let mut entry = CleaningLogEntry::new(CleaningAction::StandardizeFormat, Some(column), total)
            .with_param("canonical", DateFormat::IsoDate.name());
        for (format, count) in &converted {
            entry = entry.with_param(format.name(), count);
        }
        log.record(entry);
        log.record(
            CleaningLogEntry::new(CleaningAction::DropRow, Some(column), missing)
                .with_param("reason", "missing date"),
        );
        log.record(
            CleaningLogEntry::new(CleaningAction::DropRow, Some(column), unparseable)
                .with_param("reason", "unparseable date"),
        );
    }
    before - rows.len()
}

/// Pass 7: undo charset mis-decodes. Returns values repaired.
///
/// A repair is kept only when the recovered bytes are valid UTF-8; other
/// flagged values stay as they are and are not logged.
pub(super) fn repair_encoding(rows: &mut [Transaction], log: &mut CleaningLog) -> usize {
    let mut total = 0;
    for &column in Column::text() {
        let mut repaired = 0;
        let mut unrepairable = 0;
        for row in rows.iter_mut() {
            let Some(Some(value)) = row.text_slot(column) else {
                continue;
            };
            if !looks_corrupted(value) {
                continue;
            }
            match reverse_misdecode(value) {
                Some(fixed) => {
                    *value = fixed;
                    repaired += 1;
                }
                None => unrepairable += 1,
            }
        }
        if unrepairable > 0 {
            debug!("{} corrupted {} values could not be repaired", unrepairable, column);
        }
        log.record(
            CleaningLogEntry::new(CleaningAction::RepairEncoding, Some(column), repaired)
                .with_param("method", "latin-1 to utf-8"),
        );
        total += repaired;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defects::encoding::misdecode;
    use crate::models::tests::sample_row;

    fn row(id: u64, category: &str, amount: Option<f64>) -> Transaction {
        let mut r = sample_row(id);
        r.category = Some(category.into());
        r.amount = amount;
        r
    }

    #[test]
    fn test_numeric_imputation_uses_group_median() {
        let mut rows = vec![
            row(1, "Health", Some(100.0)),
            row(2, "Health", Some(300.0)),
            row(3, "Health", None),
            row(4, "Food", Some(10.0)),
            row(5, "Food", None),
            row(6, "Toys", None),
        ];
        let mut log = CleaningLog::new();
        impute_numeric(&mut rows, &mut log);

        assert_eq!(rows[2].amount, Some(200.0));
        assert_eq!(rows[4].amount, Some(10.0));
        // Global median of [10, 100, 300]
        assert_eq!(rows[5].amount, Some(100.0));
        assert_eq!(log.affected(CleaningAction::ImputeNumeric), 3);
        assert_eq!(log.len(), 3);
        let toys = log
            .iter()
            .find(|e| e.parameters.get("group").map(String::as_str) == Some("Toys"))
            .unwrap();
        assert_eq!(toys.parameters["strategy"], "global median");
    }

    #[test]
    fn test_numeric_imputation_drops_when_nothing_to_learn_from() {
        let mut rows = vec![row(1, "Health", None), row(2, "Food", None)];
        let mut log = CleaningLog::new();
        impute_numeric(&mut rows, &mut log);
        assert!(rows.is_empty());
        assert_eq!(log.affected(CleaningAction::DropRow), 2);
    }

    #[test]
    fn test_categorical_mode_ties_pick_smallest() {
        let mut rows: Vec<_> = (1..=5).map(|id| row(id, "Food", Some(1.0))).collect();
        rows[0].city = Some("부산".into());
        rows[1].city = Some("대구".into());
        rows[2].city = Some("부산".into());
        rows[3].city = Some("대구".into());
        rows[4].city = None;
        let mut log = CleaningLog::new();
        impute_categorical(&mut rows, &mut log);
        // "대구" < "부산" in code point order
        assert_eq!(rows[4].city.as_deref(), Some("대구"));
        assert_eq!(log.affected_in(CleaningAction::ImputeCategorical, Column::City), 1);
    }

    #[test]
    fn test_category_imputed_before_grouped_columns() {
        let mut rows: Vec<_> = (1..=3).map(|id| row(id, "Food", Some(1.0))).collect();
        rows[2].category = None;
        rows[2].product = None;
        let mut log = CleaningLog::new();
        impute_categorical(&mut rows, &mut log);
        assert_eq!(rows[2].category.as_deref(), Some("Food"));
        assert_eq!(rows[2].product.as_deref(), Some("Rice"));
        let order: Vec<Column> = log.iter().filter_map(|e| e.column).collect();
        assert_eq!(order, vec![Column::Category, Column::Product]);
    }

    #[test]
    fn test_out_of_range_rows_are_dropped() {
        let mut rows: Vec<_> = (1..=7).map(|id| row(id, "Food", Some(100.0))).collect();
        rows[0].income_tier = Some(9);
        rows[1].income_tier = Some(0);
        rows[2].amount = Some(-500.0);
        rows[3].amount = Some(f64::NAN);
        rows[4].amount = Some(f64::INFINITY);
        // Both broken: counted once, under income_tier
        rows[5].income_tier = Some(6);
        rows[5].amount = Some(-1.0);
        let mut log = CleaningLog::new();
        drop_out_of_range(&mut rows, &mut log);

        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7]);
        assert_eq!(log.affected_in(CleaningAction::DropRow, Column::IncomeTier), 3);
        assert_eq!(log.affected_in(CleaningAction::DropRow, Column::Amount), 3);
        assert!(log.iter().all(|e| e.parameters["reason"] == "out of range"));

        let mut again = CleaningLog::new();
        drop_out_of_range(&mut rows, &mut again);
        assert!(again.is_empty());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut rows = vec![sample_row(1), sample_row(2), sample_row(1)];
        let mut log = CleaningLog::new();
        deduplicate(&mut rows, &mut log);
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(log.affected(CleaningAction::Deduplicate), 1);
    }

    #[test]
    fn test_capping_is_stable() {
        let mut rows: Vec<_> = (1..=100)
            .map(|id| row(id, "Food", Some(id as f64 * 10.0)))
            .collect();
        rows[0].amount = Some(1_000_000.0);
        let mut log = CleaningLog::new();
        cap_outliers(&mut rows, &mut log);
        assert_eq!(log.affected(CleaningAction::CapOutlier), 1);

        let mut again = CleaningLog::new();
        cap_outliers(&mut rows, &mut again);
        assert!(again.is_empty());
    }

    #[test]
    fn test_standardize_converts_and_drops() {
        let mut rows: Vec<_> = (1..=5).map(sample_row).collect();
        rows[0].date = Some("2024/03/15".into());
        rows[1].date = Some("15-03-2024".into());
        rows[2].date = Some("someday".into());
        rows[3].date = None;
        let mut log = CleaningLog::new();
        let dropped = standardize_formats(&mut rows, &mut log);

        assert_eq!(dropped, 2);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.date.as_deref() == Some("2024-03-15")));
        assert_eq!(log.affected(CleaningAction::StandardizeFormat), 2);
        assert_eq!(log.affected(CleaningAction::DropRow), 2);
    }

    #[test]
    fn test_repair_encoding_only_logs_successes() {
        let mut rows: Vec<_> = (1..=3).map(sample_row).collect();
        rows[0].city = Some(misdecode("광주"));
        rows[1].city = Some("Gwang\u{FFFD}u".into());
        let mut log = CleaningLog::new();
        let repaired = repair_encoding(&mut rows, &mut log);

        assert_eq!(repaired, 1);
        assert_eq!(rows[0].city.as_deref(), Some("광주"));
        assert_eq!(rows[1].city.as_deref(), Some("Gwang\u{FFFD}u"));
        assert_eq!(log.affected(CleaningAction::RepairEncoding), 1);
    }
}
