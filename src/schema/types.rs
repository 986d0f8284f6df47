//! Entity schema types: field specs, semantic types and policy labels.

use crate::config::ValidationRule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name reserved for the system-assigned record identity.
pub const ID_FIELD: &str = "id";

/// Semantic type of a declared field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Json,
}

impl FieldType {
    /// The value reported for `EmptyOnRead` fields.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldType::String => Value::String(String::new()),
            FieldType::Integer | FieldType::Number => Value::Number(0.into()),
            FieldType::Boolean => Value::Bool(false),
            FieldType::Json => Value::Null,
        }
    }

    /// Whether a non-null value is acceptable for this type.
    pub fn accepts(&self, v: &Value) -> bool {
        match self {
            FieldType::String => v.is_string(),
            FieldType::Integer => v.is_i64() || v.is_u64(),
            FieldType::Number => v.is_number(),
            FieldType::Boolean => v.is_boolean(),
            FieldType::Json => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Json => "json",
        };
        f.write_str(name)
    }
}

/// Visibility label attached to a field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLabel {
    /// Never leaves the store in any outward projection.
    Hide,
    /// Stored, but reported as the type's empty value.
    EmptyOnRead,
    /// Behaviour bound by the policy configuration; passes through if unbound.
    Custom(String),
}

impl PolicyLabel {
    /// Maps a declared label name (`hide`, `empty`, anything else) to a label.
    pub fn from_name(name: &str) -> Self {
        match name {
            "hide" => PolicyLabel::Hide,
            "empty" | "empty_on_read" => PolicyLabel::EmptyOnRead,
            other => PolicyLabel::Custom(other.to_string()),
        }
    }
}

/// Per-field metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub label: Option<PolicyLabel>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            unique: false,
            required: true,
            label: None,
            validation: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::Json)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn labeled(mut self, label: PolicyLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn hidden(self) -> Self {
        self.labeled(PolicyLabel::Hide)
    }

    pub fn empty_on_read(self) -> Self {
        self.labeled(PolicyLabel::EmptyOnRead)
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }
}

/// Describes an entity type: its name and ordered field list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    fields: Vec<FieldSpec>,
}

impl EntitySchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Builder-style append; only meaningful before registration.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }
}

/// Capability of a plain data type that is paired with an entity schema.
///
/// Any `Serialize` type can be persisted once its schema is registered; no
/// shared base type is involved.
pub trait Persistable: Serialize {
    fn entity_name() -> &'static str;

    fn entity_schema() -> EntitySchema;
}
