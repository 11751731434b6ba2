//! Schema definitions guiding payload decoding.
//!
//! A [`Schema`] is an ordered list of named, typed fields describing the
//! shape a decoded [`Record`](crate::Record) must conform to. Schemas are
//! read-only inputs to decoding; they are typically loaded from YAML files:
//!
//! ```yaml
//! fields:
//!   - name: id
//!     type: int
//!   - name: message
//!     type: string
//!   - name: created_at
//!     type: timestamp
//!     nullable: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading a schema file
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("failed to parse schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Duplicate field name in a schema definition
    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),
}

/// Data types a schema field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Boolean value
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit IEEE 754 floating point
    Float,
    /// UTF-8 string
    String,
    /// Binary data (base64-encoded in JSON payloads)
    Bytes,
    /// RFC 3339 timestamp with timezone
    Timestamp,
    /// Arbitrary nested JSON, passed through undecoded
    Json,
}

/// A single named, typed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name as it appears in payloads and decoded records.
    pub name: String,

    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field may be absent or null in a payload.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDefinition {
    /// Create a non-nullable field definition.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }

    /// Create a nullable field definition.
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// Ordered field-name-to-type mapping for one stream's records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Fields in declaration order.
    pub fields: Vec<FieldDefinition>,
}

impl Schema {
    /// A schema with no fields. Decoding against it yields empty records.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a schema from field definitions, rejecting duplicate names.
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Parse a schema from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_yaml::from_str(s)?;
        Schema::new(schema.fields)
    }

    /// Load a schema from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
fields:
  - name: id
    type: int
  - name: message
    type: string
  - name: created_at
    type: timestamp
    nullable: true
"#;

    #[test]
    fn parses_yaml_schema_in_order() {
        let schema = Schema::from_yaml_str(YAML).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields[0].name, "id");
        assert_eq!(schema.fields[0].field_type, FieldType::Int);
        assert!(!schema.fields[0].nullable);
        assert_eq!(schema.fields[2].name, "created_at");
        assert!(schema.fields[2].nullable);
    }

    #[test]
    fn field_lookup_by_name() {
        let schema = Schema::from_yaml_str(YAML).unwrap();
        assert_eq!(schema.field("message").unwrap().field_type, FieldType::String);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let fields = vec![
            FieldDefinition::new("id", FieldType::Int),
            FieldDefinition::new("id", FieldType::String),
        ];
        assert!(matches!(
            Schema::new(fields),
            Err(SchemaError::DuplicateField(name)) if name == "id"
        ));
    }
}
