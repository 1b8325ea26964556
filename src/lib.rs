//! # Weather Logger Core Library
//!
//! Scrapes the BBC Weather forecast page and the BBC tide-table page, flattens the
//! readings into a single [`Record`] and appends it to durable storage (a CSV file
//! and/or a Google Sheets worksheet) on a fixed schedule.
//!
//! ## Data Flow
//!
//! 1. **Fetch**: download the weather page and the tide page, once each per cycle
//! 2. **Extract**: apply fixed location-path rules to the parsed documents
//! 3. **Record**: prepend the time of search, append the tide table
//! 4. **Store**: append one row to every configured destination
//!
//! Missing nodes never abort a cycle; they become [`FieldValue::Unavailable`]
//! (rendered `N/A`). A node that is present but holds a malformed number does
//! abort it, since that means the page layout moved.
//!
//! ## Core Types
//!
//! - [`FieldValue`]: one extracted value (text, number, or the sentinel)
//! - [`Record`]: the ordered set of values produced by one cycle

use serde::{Serialize, Serializer};
use std::fmt;

// Module declarations
pub mod config;
pub mod csv_store;
pub mod driver;
pub mod extract;
pub mod fetch;
pub mod layout;
pub mod observation;
pub mod recorder;
pub mod report;
pub mod sheets;
pub mod tide;
pub mod xpath;

#[cfg(test)]
mod tests;

/// Text written in place of a value whose node could not be found.
pub const SENTINEL: &str = "N/A";

/// A single extracted value.
///
/// # Example
/// ```
/// use weather_logger_lib::FieldValue;
///
/// assert_eq!(FieldValue::Float(21.0).to_string(), "21.0");
/// assert_eq!(FieldValue::Float(8.5).to_string(), "8.5");
/// assert_eq!(FieldValue::Unavailable.to_string(), "N/A");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Trimmed node text, suffix removed
    Text(String),
    /// Node text parsed as a number
    Float(f64),
    /// No node matched the rule's path
    Unavailable,
}

impl FieldValue {
    /// True for the missing-node sentinel.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FieldValue::Unavailable)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            // 21.0 prints as "21.0", not "21"
            FieldValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Unavailable => f.write_str(SENTINEL),
        }
    }
}

/// Numbers serialize as JSON numbers, everything else as strings.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Unavailable => serializer.serialize_str(SENTINEL),
        }
    }
}

/// One row of observations, in column order.
///
/// Records are assembled once per cycle and never modified afterwards; the
/// only way to build one is from a complete list of fields.
///
/// # Example
/// ```
/// use weather_logger_lib::{FieldValue, Record};
///
/// let record = Record::new(vec![
///     ("Location".to_string(), FieldValue::Text("London".into())),
///     ("Humidity(%)".to_string(), FieldValue::Float(71.0)),
/// ]);
///
/// assert_eq!(record.columns().collect::<Vec<_>>(), ["Location", "Humidity(%)"]);
/// assert_eq!(record.get("Humidity(%)"), Some(&FieldValue::Float(71.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new(fields: Vec<(String, FieldValue)>) -> Self {
        Record { fields }
    }

    /// Value of the named column, if the record has it.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the columns that fell back to the sentinel.
    pub fn unavailable(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, value)| value.is_unavailable())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn into_fields(self) -> Vec<(String, FieldValue)> {
        self.fields
    }
}
