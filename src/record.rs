// src/record.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scraped cell. A missing cell is `None` at the use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Integer(i64),
    Text(String),
}

impl RawValue {
    /// Text view of the cell; integers are rendered in decimal.
    pub fn as_text(&self) -> String {
        match self {
            RawValue::Integer(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Integer(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Position of the table among the extracted tables (0-based).
    pub position: usize,
    /// Label of the heading that preceded the table, if any.
    pub section: Option<String>,
    /// Column names as they appear in the header row.
    pub headers: Vec<String>,
    /// One entry per body row, exactly `headers.len()` cells wide.
    pub rows: Vec<Vec<Option<RawValue>>>,
}

impl RawTable {
    /// Human-readable handle used in logs and errors.
    pub fn describe(&self) -> String {
        match &self.section {
            Some(s) => format!("#{} ({})", self.position, s),
            None => format!("#{} (no section)", self.position),
        }
    }
}

/// Row of a reconciled table: schema aligned, category normalized,
/// year and magnitude still raw.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub year: Option<RawValue>,
    pub magnitude: Option<RawValue>,
    pub event: Option<String>,
    pub category: Option<String>,
}

/// Fully normalized output row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub year: i64,
    pub magnitude: i64,
    pub event: String,
    pub category: String,
}
