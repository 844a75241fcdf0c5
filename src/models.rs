//! Core data models for spendlab
//!
//! A `Dataset` is an ordered sequence of `Transaction` records. Every field
//! except `id` is nullable so that the defect injector can blank it out and
//! the detector can count the blanks.

use crate::source::TIERS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns of the transaction schema, in canonical order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    IncomeTier,
    Category,
    Product,
    Amount,
    Date,
    City,
    Status,
}

impl Column {
    pub fn all() -> &'static [Column] {
        &[
            Column::Id,
            Column::IncomeTier,
            Column::Category,
            Column::Product,
            Column::Amount,
            Column::Date,
            Column::City,
            Column::Status,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::IncomeTier => "income_tier",
            Column::Category => "category",
            Column::Product => "product",
            Column::Amount => "amount",
            Column::Date => "date",
            Column::City => "city",
            Column::Status => "status",
        }
    }

    /// Resolve a column from a user-supplied name.
    ///
    /// Accepts `income_tier`, `incomeTier` and `income-tier` alike.
    pub fn from_name(name: &str) -> Option<Column> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(|c| c.to_lowercase())
            .collect();
        Column::all()
            .iter()
            .copied()
            .find(|c| c.name().replace('_', "") == normalized)
    }

    /// Columns scanned for statistical outliers
    pub fn numeric() -> &'static [Column] {
        &[Column::Amount]
    }

    /// Columns imputed with a group mode, in imputation order.
    ///
    /// `category` comes first because it is the grouping key for the rest.
    pub fn categorical() -> &'static [Column] {
        &[
            Column::Category,
            Column::IncomeTier,
            Column::Product,
            Column::City,
            Column::Status,
        ]
    }

    /// Free-text columns checked for charset corruption
    pub fn text() -> &'static [Column] {
        &[Column::Category, Column::Product, Column::City]
    }

    /// Columns holding date-like text
    pub fn date_like() -> &'static [Column] {
        &[Column::Date]
    }

    /// Columns with a value range beyond "present"
    pub fn range_checked() -> &'static [Column] {
        &[Column::IncomeTier, Column::Amount]
    }

    pub fn is_numeric(&self) -> bool {
        Column::numeric().contains(self)
    }

    /// Whether the injector may null this column
    pub fn is_nullable(&self) -> bool {
        !matches!(self, Column::Id)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settlement status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Completed,
    Pending,
    Cancelled,
}

impl Status {
    pub fn all() -> &'static [Status] {
        &[Status::Completed, Status::Pending, Status::Cancelled]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Completed => "completed",
            Status::Pending => "pending",
            Status::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        Status::all()
            .iter()
            .copied()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthetic purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub income_tier: Option<u8>,
    pub category: Option<String>,
    pub product: Option<String>,
    pub amount: Option<f64>,
    /// Textual date; canonical form is `YYYY-MM-DD`
    pub date: Option<String>,
    pub city: Option<String>,
    pub status: Option<Status>,
}

impl Transaction {
    /// Null or blank.
    pub fn is_missing(&self, column: Column) -> bool {
        match column {
            Column::Id => false,
            Column::IncomeTier => self.income_tier.is_none(),
            Column::Amount => self.amount.is_none(),
            Column::Status => self.status.is_none(),
            Column::Category | Column::Product | Column::Date | Column::City => self
                .text(column)
                .map_or(true, |s| s.trim().is_empty()),
        }
    }

    /// Present but outside the column's allowed range: a tier other than
    /// 1-5, or an amount that is negative or not finite.
    pub fn is_out_of_range(&self, column: Column) -> bool {
        match column {
            Column::IncomeTier => self.income_tier.is_some_and(|t| !TIERS.contains(&t)),
            Column::Amount => self.amount.is_some_and(|a| !a.is_finite() || a < 0.0),
            _ => false,
        }
    }

    /// Borrow a string-typed column
    pub fn text(&self, column: Column) -> Option<&str> {
        match column {
            Column::Category => self.category.as_deref(),
            Column::Product => self.product.as_deref(),
            Column::Date => self.date.as_deref(),
            Column::City => self.city.as_deref(),
            _ => None,
        }
    }

    /// Mutable slot of a string-typed column
    pub fn text_slot(&mut self, column: Column) -> Option<&mut Option<String>> {
        match column {
            Column::Category => Some(&mut self.category),
            Column::Product => Some(&mut self.product),
            Column::Date => Some(&mut self.date),
            Column::City => Some(&mut self.city),
            _ => None,
        }
    }

    pub fn numeric(&self, column: Column) -> Option<f64> {
        match column {
            Column::Amount => self.amount,
            _ => None,
        }
    }

    pub fn set_numeric(&mut self, column: Column, value: f64) {
        if column == Column::Amount {
            self.amount = Some(value);
        }
    }

    /// Categorical value rendered as a string, `None` when missing
    pub fn categorical(&self, column: Column) -> Option<String> {
        if self.is_missing(column) {
            return None;
        }
        match column {
            Column::IncomeTier => self.income_tier.map(|t| t.to_string()),
            Column::Status => self.status.map(|s| s.as_str().to_string()),
            Column::Id => Some(self.id.to_string()),
            _ => self.text(column).map(str::to_string),
        }
    }

    /// Assign a categorical value produced by `categorical`.
    ///
    /// Returns false when the value does not parse for the column.
    pub fn set_categorical(&mut self, column: Column, value: &str) -> bool {
        match column {
            Column::IncomeTier => match value.parse::<u8>() {
                Ok(t) => {
                    self.income_tier = Some(t);
                    true
                }
                Err(_) => false,
            },
            Column::Status => match Status::parse(value) {
                Some(s) => {
                    self.status = Some(s);
                    true
                }
                None => false,
            },
            _ => match self.text_slot(column) {
                Some(slot) => {
                    *slot = Some(value.to_string());
                    true
                }
                None => false,
            },
        }
    }

    /// Null a field. `id` is never nulled.
    pub fn clear(&mut self, column: Column) {
        match column {
            Column::Id => {}
            Column::IncomeTier => self.income_tier = None,
            Column::Amount => self.amount = None,
            Column::Status => self.status = None,
            _ => {
                if let Some(slot) = self.text_slot(column) {
                    *slot = None;
                }
            }
        }
    }

    /// Hashable full-row identity used for duplicate grouping
    pub fn row_key(&self) -> RowKey {
        RowKey {
            id: self.id,
            income_tier: self.income_tier,
            category: self.category.clone(),
            product: self.product.clone(),
            amount_bits: self.amount.map(f64::to_bits),
            date: self.date.clone(),
            city: self.city.clone(),
            status: self.status,
        }
    }
}

/// Full-row equality key. Amounts compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    id: u64,
    income_tier: Option<u8>,
    category: Option<String>,
    product: Option<String>,
    amount_bits: Option<u64>,
    date: Option<String>,
    city: Option<String>,
    status: Option<Status>,
}

/// Ordered, immutable-by-convention batch of transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: Vec<Transaction>,
}

impl Dataset {
    pub fn new(rows: Vec<Transaction>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Transaction> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.rows.iter()
    }

    pub fn column_count(&self) -> usize {
        Column::all().len()
    }

    /// Non-null values of a numeric column, in row order
    pub fn numeric_values(&self, column: Column) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.numeric(column)).collect()
    }
}

impl FromIterator<Transaction> for Dataset {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
