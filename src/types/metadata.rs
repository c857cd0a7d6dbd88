//! Flat scalar metadata attached to records.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar metadata value.
///
/// Serialized untagged, so `{"name": "Alice", "page": 12, "draft": false}`
/// round-trips as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Flat key/value metadata of a record.
pub type Metadata = BTreeMap<String, MetadataValue>;

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by range comparisons; integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Null, arrays and objects are not metadata.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetadataValue::Integer)
                .or_else(|| n.as_f64().map(MetadataValue::Float)),
            serde_json::Value::String(s) => Some(MetadataValue::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
            MetadataValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Integer(i as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Validate a JSON object into [`Metadata`].
///
/// Every value must be a string, number or boolean; anything else is a
/// validation error naming the offending key.
pub fn metadata_from_json(value: &serde_json::Value) -> Result<Metadata> {
    let object = value.as_object().ok_or_else(|| {
        Error::validation_with_context(
            "Metadata must be a JSON object",
            ErrorContext::new()
                .with_field_path("metadata")
                .with_details(format!("got {}", json_kind(value))),
        )
    })?;
    let mut metadata = Metadata::new();
    for (key, raw) in object {
        let scalar = MetadataValue::from_json(raw).ok_or_else(|| {
            Error::validation_with_context(
                "Metadata values must be strings, numbers or booleans",
                ErrorContext::new()
                    .with_field_path(format!("metadata.{}", key))
                    .with_details(format!("got {}", json_kind(raw))),
            )
        })?;
        metadata.insert(key.clone(), scalar);
    }
    Ok(metadata)
}

/// Reject values that cannot be persisted as JSON.
///
/// `NaN` and the infinities have no JSON number form, so a snapshot holding
/// one could not be read back.
pub fn validate_metadata(metadata: &Metadata, field_path: &str) -> Result<()> {
    for (key, value) in metadata {
        if let MetadataValue::Float(f) = value {
            if !f.is_finite() {
                return Err(Error::validation_with_context(
                    "Metadata numbers must be finite",
                    ErrorContext::new()
                        .with_field_path(format!("{}.{}", field_path, key))
                        .with_details(format!("got {}", f)),
                ));
            }
        }
    }
    Ok(())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_are_accepted() {
        let metadata = metadata_from_json(&json!({
            "name": "Sports Article",
            "page_number": 12,
            "score": 0.75,
            "published": true
        }))
        .unwrap();
        assert_eq!(metadata["name"], MetadataValue::from("Sports Article"));
        assert_eq!(metadata["page_number"], MetadataValue::Integer(12));
        assert_eq!(metadata["score"], MetadataValue::Float(0.75));
        assert_eq!(metadata["published"], MetadataValue::Bool(true));
    }

    #[test]
    fn test_nested_value_is_rejected() {
        let err = metadata_from_json(&json!({"tags": ["a", "b"]})).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("metadata.tags")
        );
    }

    #[test]
    fn test_null_value_is_rejected() {
        assert!(metadata_from_json(&json!({"name": null})).is_err());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(metadata_from_json(&json!("Alice")).is_err());
    }

    #[test]
    fn test_untagged_serde_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), "Bob".into());
        metadata.insert("page".into(), 3.into());
        let encoded = serde_json::to_value(&metadata).unwrap();
        assert_eq!(encoded, json!({"name": "Bob", "page": 3}));
        let decoded: Metadata = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut metadata = Metadata::new();
            metadata.insert("score".into(), bad.into());
            let err = validate_metadata(&metadata, "metadata").unwrap_err();
            assert!(err.is_validation());
            assert_eq!(
                err.context().and_then(|c| c.field_path.as_deref()),
                Some("metadata.score")
            );
        }
        let mut metadata = Metadata::new();
        metadata.insert("score".into(), 0.25.into());
        assert!(validate_metadata(&metadata, "metadata").is_ok());
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(MetadataValue::Integer(4).as_f64(), Some(4.0));
        assert_eq!(MetadataValue::from("4").as_f64(), None);
    }
}
