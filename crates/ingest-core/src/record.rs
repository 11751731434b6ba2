//! The reusable decode destination.
//!
//! A [`Record`] is a mutable, named-field container that sessions decode
//! raw payloads into. Callers pass one record to many
//! [`next_decoded`](crate::StreamLevelConsumer::next_decoded) calls; the
//! session clears and refills it, so the container itself is allocated once
//! per loop rather than once per record.

use crate::error::ConsumerError;
use crate::offset::Offset;
use crate::schema::{FieldType, Schema};
use base64::Engine;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date/time with timezone
    Timestamp(DateTime<Utc>),
    /// Nested JSON passed through undecoded
    Json(serde_json::Value),
    /// Null value (nullable field absent or explicitly null)
    Null,
}

impl FieldValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get this value as a timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Mutable named-field container, the destination of decoding.
///
/// Field order is not significant; the paired [`Schema`] carries ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all fields, keeping the container for reuse.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Set a field value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Number of fields currently set.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Decode a raw JSON payload into this record according to `schema`.
    ///
    /// The record is cleared first, so a previous record's fields never leak
    /// into the next one. Payload keys not named by the schema are ignored;
    /// schema fields missing from the payload must be nullable or decoding
    /// fails. `offset` is only used to label the error.
    pub fn decode_json(
        &mut self,
        schema: &Schema,
        payload: &[u8],
        offset: Offset,
    ) -> Result<(), ConsumerError> {
        let decode_err = |source: anyhow::Error| ConsumerError::Decode { offset, source };

        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| decode_err(anyhow::anyhow!("payload is not valid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| decode_err(anyhow::anyhow!("payload is not a JSON object")))?;

        self.clear();
        for field in &schema.fields {
            let raw = object.get(&field.name).unwrap_or(&serde_json::Value::Null);
            if raw.is_null() {
                if !field.nullable {
                    return Err(decode_err(anyhow::anyhow!(
                        "required field '{}' is missing or null",
                        field.name
                    )));
                }
                self.insert(&field.name, FieldValue::Null);
                continue;
            }
            let decoded = coerce(raw, field.field_type).map_err(|e| {
                decode_err(anyhow::anyhow!("field '{}': {e}", field.name))
            })?;
            self.insert(&field.name, decoded);
        }
        Ok(())
    }
}

/// Coerce a JSON value into the typed representation a schema field demands.
fn coerce(raw: &serde_json::Value, field_type: FieldType) -> anyhow::Result<FieldValue> {
    match field_type {
        FieldType::Bool => raw
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| anyhow::anyhow!("expected boolean, got {raw}")),
        FieldType::Int => raw
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| anyhow::anyhow!("expected integer, got {raw}")),
        FieldType::Float => raw
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| anyhow::anyhow!("expected number, got {raw}")),
        FieldType::String => raw
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| anyhow::anyhow!("expected string, got {raw}")),
        FieldType::Bytes => {
            let encoded = raw
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("expected base64 string, got {raw}"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| anyhow::anyhow!("invalid base64: {e}"))?;
            Ok(FieldValue::Bytes(bytes))
        }
        FieldType::Timestamp => {
            let s = raw
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("expected RFC 3339 string, got {raw}"))?;
            let ts = DateTime::parse_from_rfc3339(s)
                .map_err(|e| anyhow::anyhow!("invalid timestamp '{s}': {e}"))?;
            Ok(FieldValue::Timestamp(ts.with_timezone(&Utc)))
        }
        FieldType::Json => Ok(FieldValue::Json(raw.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDefinition;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDefinition::new("id", FieldType::Int),
            FieldDefinition::new("message", FieldType::String),
            FieldDefinition::nullable("score", FieldType::Float),
            FieldDefinition::nullable("created_at", FieldType::Timestamp),
        ])
        .unwrap()
    }

    #[test]
    fn decodes_payload_into_typed_fields() {
        let mut record = Record::new();
        record
            .decode_json(
                &schema(),
                br#"{"id": 7, "message": "hello", "score": 0.5, "created_at": "2024-01-01T00:00:00Z"}"#,
                Offset(0),
            )
            .unwrap();

        assert_eq!(record.get("id").unwrap().as_i64(), Some(7));
        assert_eq!(record.get("message").unwrap().as_str(), Some("hello"));
        assert_eq!(record.get("score").unwrap().as_f64(), Some(0.5));
        assert!(record.get("created_at").unwrap().as_timestamp().is_some());
    }

    #[test]
    fn reuse_clears_previous_fields() {
        let mut record = Record::new();
        record
            .decode_json(&schema(), br#"{"id": 1, "message": "a", "score": 1.0}"#, Offset(0))
            .unwrap();
        record
            .decode_json(&schema(), br#"{"id": 2, "message": "b"}"#, Offset(1))
            .unwrap();

        assert_eq!(record.get("id").unwrap().as_i64(), Some(2));
        // score was present in the first payload, absent (nullable) in the second
        assert!(record.get("score").unwrap().is_null());
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn missing_required_field_fails() {
        let mut record = Record::new();
        let err = record
            .decode_json(&schema(), br#"{"message": "no id"}"#, Offset(3))
            .unwrap_err();
        assert!(matches!(err, ConsumerError::Decode { offset: Offset(3), .. }));
        assert!(err.to_string().contains("offset 3"));
    }

    #[test]
    fn type_mismatch_fails() {
        let mut record = Record::new();
        let err = record
            .decode_json(&schema(), br#"{"id": "not-a-number", "message": "x"}"#, Offset(0))
            .unwrap_err();
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("expected integer"));
    }

    #[test]
    fn non_object_payload_fails() {
        let mut record = Record::new();
        assert!(record.decode_json(&schema(), b"[1,2,3]", Offset(0)).is_err());
        assert!(record.decode_json(&schema(), b"not json", Offset(0)).is_err());
    }

    #[test]
    fn bytes_fields_decode_base64() {
        let schema = Schema::new(vec![FieldDefinition::new("blob", FieldType::Bytes)]).unwrap();
        let mut record = Record::new();
        record
            .decode_json(&schema, br#"{"blob": "aGVsbG8="}"#, Offset(0))
            .unwrap();
        assert_eq!(record.get("blob").unwrap().as_bytes(), Some(&b"hello"[..]));
    }

    #[test]
    fn payload_keys_outside_schema_are_ignored() {
        let mut record = Record::new();
        record
            .decode_json(&schema(), br#"{"id": 1, "message": "a", "extra": true}"#, Offset(0))
            .unwrap();
        assert!(record.get("extra").is_none());
    }
}
