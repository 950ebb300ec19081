//! Loosely-typed cell values and rows as they arrive from ingestion
//! sources.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single raw cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Missing or null cell.
    Empty,
    /// Boolean cell.
    Bool(bool),
    /// Numeric cell (also used for spreadsheet date serials).
    Number(f64),
    /// Already-decoded point in time.
    Date(DateTime<Utc>),
    /// Free text.
    Text(String),
}

impl RawValue {
    /// Whether the value carries no content (empty, null, or blank text).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::Date(_) => false,
        }
    }

    /// Renders the value as text for name-like fields.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Date(d) => Some(d.to_rfc3339()),
        }
    }

    /// Compact description used in rejection messages.
    #[must_use]
    pub fn describe(&self) -> String {
        self.as_text().unwrap_or_default()
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<&serde_json::Value> for RawValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Empty, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Object(obj) => store_timestamp(obj)
                .map_or_else(|| Self::Text(value.to_string()), Self::Date),
            serde_json::Value::Array(_) => Self::Text(value.to_string()),
        }
    }
}

/// Decodes a store-native timestamp object (`{seconds, nanoseconds}`, or
/// the underscore-prefixed admin-SDK form).
fn store_timestamp(obj: &serde_json::Map<String, serde_json::Value>) -> Option<DateTime<Utc>> {
    let seconds = obj
        .get("seconds")
        .or_else(|| obj.get("_seconds"))?
        .as_i64()?;
    let nanos = obj
        .get("nanoseconds")
        .or_else(|| obj.get("_nanoseconds"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
}

/// One raw input row keyed by its original column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, RawValue>);

impl RawRow {
    /// Creates an empty row.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a cell, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Cell under an exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key)
    }

    /// Column names present in this row.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether every cell is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.values().all(RawValue::is_blank)
    }

    /// Converts a JSON object into a row. Returns `None` for non-objects.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(
            obj.iter()
                .map(|(k, v)| (k.clone(), RawValue::from(v)))
                .collect(),
        )
    }
}

impl FromIterator<(String, RawValue)> for RawRow {
    fn from_iter<T: IntoIterator<Item = (String, RawValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_timestamp_object_becomes_date() {
        let value = serde_json::json!({"seconds": 1_684_108_800, "nanoseconds": 0});
        let RawValue::Date(date) = RawValue::from(&value) else {
            panic!("expected a date");
        };
        assert_eq!(date.to_rfc3339(), "2023-05-15T00:00:00+00:00");
    }

    #[test]
    fn admin_sdk_timestamp_object_becomes_date() {
        let value = serde_json::json!({"_seconds": 0, "_nanoseconds": 500_000_000});
        assert!(matches!(RawValue::from(&value), RawValue::Date(_)));
    }

    #[test]
    fn unrelated_object_stays_text() {
        let value = serde_json::json!({"foo": 1});
        assert!(matches!(RawValue::from(&value), RawValue::Text(_)));
    }

    #[test]
    fn row_from_json_object() {
        let row = RawRow::from_json(&serde_json::json!({
            "District": "Puri",
            "Cases Registered": 12,
            "Remarks": null,
        }))
        .unwrap();
        assert_eq!(row.get("District"), Some(&RawValue::Text("Puri".into())));
        assert_eq!(row.get("Cases Registered"), Some(&RawValue::Number(12.0)));
        assert!(row.get("Remarks").unwrap().is_blank());
        assert!(RawRow::from_json(&serde_json::json!([1, 2])).is_none());
    }
}
