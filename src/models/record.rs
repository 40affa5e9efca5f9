//! Flat input records.
//!
//! A [`Record`] is one normalized row: column names are lowercased and
//! underscored, and every absent, blank, or missing-marker value reads as
//! [`UNKNOWN`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel substituted for missing source values.
pub const UNKNOWN: &str = "Unknown";

/// A normalized row of field name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, normalizing both column name and value.
    #[must_use]
    pub fn with_field(mut self, column: &str, value: &str) -> Self {
        self.insert(column, value);
        self
    }

    /// Inserts a field, normalizing both column name and value.
    pub fn insert(&mut self, column: &str, value: &str) {
        self.fields
            .insert(normalize_column(column), normalize_value(value));
    }

    /// Returns the value of a column, or [`UNKNOWN`] if absent.
    #[must_use]
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map_or(UNKNOWN, String::as_str)
    }

    /// Returns true if the record has an explicit value for the column.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (column, value) in iter {
            record.insert(column.as_ref(), value.as_ref());
        }
        record
    }
}

/// Normalizes a column header: trimmed, lowercase, with spaces and dashes as `_`.
#[must_use]
pub fn normalize_column(column: &str) -> String {
    column
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect()
}

/// Cell spellings read as missing, matching the default NA markers of common
/// dataframe CSV readers. Matching is case-sensitive.
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Normalizes a field value: trimmed, with blanks and missing markers replaced
/// by [`UNKNOWN`].
#[must_use]
pub fn normalize_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}
