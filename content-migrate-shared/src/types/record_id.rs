//! Record identifier type.
//!
//! Content stores assign identifiers on their side and expose them either as integers
//! (`"id": 12`) or as opaque strings (`"documentId": "k3x9..."`). `RecordId` keeps the
//! original JSON form so an identifier can be written back exactly as the store expects it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque, store-assigned identifier of a record or media asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer primary key.
    Numeric(i64),
    /// String identifier.
    Text(String),
}

impl RecordId {
    /// Read an identifier from a JSON scalar.
    ///
    /// Integers and non-empty strings are identifiers; everything else (null, booleans,
    /// floats, empty strings, objects) is not.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Numeric),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Read the identifier a relation or media value points at.
    ///
    /// Accepts a bare identifier (`12`) or an object carrying `id_field`
    /// (`{"id": 12, "title": ...}`), which is the shape relations take when the
    /// store expands them.
    pub fn from_reference(value: &Value, id_field: &str) -> Option<Self> {
        match value {
            Value::Object(map) => map.get(id_field).and_then(Self::from_value),
            other => Self::from_value(other),
        }
    }

    /// Read the identifier stored under `id_field` of a record object.
    pub fn of_record(record: &Value, id_field: &str) -> Option<Self> {
        record
            .as_object()
            .and_then(|map| map.get(id_field))
            .and_then(Self::from_value)
    }

    /// Convert back to the JSON form the store uses.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Numeric(n) => Value::from(*n),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_accepts_integers_and_strings() {
        assert_eq!(RecordId::from_value(&json!(7)), Some(RecordId::Numeric(7)));
        assert_eq!(
            RecordId::from_value(&json!("abc")),
            Some(RecordId::Text("abc".to_string()))
        );
    }

    #[test]
    fn test_from_value_rejects_non_identifiers() {
        assert_eq!(RecordId::from_value(&json!(null)), None);
        assert_eq!(RecordId::from_value(&json!("")), None);
        assert_eq!(RecordId::from_value(&json!(1.5)), None);
        assert_eq!(RecordId::from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn test_from_reference_reads_expanded_objects() {
        let expanded = json!({"id": 3, "title": "Home"});
        assert_eq!(
            RecordId::from_reference(&expanded, "id"),
            Some(RecordId::Numeric(3))
        );
        assert_eq!(RecordId::from_reference(&json!(4), "id"), Some(4.into()));
        assert_eq!(RecordId::from_reference(&json!({"title": "x"}), "id"), None);
    }

    #[test]
    fn test_round_trip_keeps_json_form() {
        let numeric = RecordId::Numeric(42);
        let text = RecordId::from("doc-1");

        assert_eq!(numeric.to_value(), json!(42));
        assert_eq!(text.to_value(), json!("doc-1"));
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "42");
        assert_eq!(
            serde_json::from_str::<RecordId>("\"doc-1\"").unwrap(),
            text
        );
        assert_eq!(numeric.to_string(), "42");
    }
}
