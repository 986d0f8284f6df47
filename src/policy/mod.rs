//! Field policy enforcement: turns stored records into outward projections.
//!
//! Applied once, at the boundary between storage and any caller outside the
//! core. Never writes back to storage.

mod outward;

pub use outward::OutwardRecord;

use crate::error::AppError;
use crate::query::Filter;
use crate::schema::{EntitySchema, FieldSpec, FieldType, PolicyLabel};
use crate::store::{Fields, Record};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Facts about the caller that label policies may consult.
#[derive(Clone, Debug, Default)]
pub struct ViewerContext {
    /// Request path, e.g. `/api/v1/users/1`.
    pub path: Option<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_path(path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
        }
    }
}

/// How a custom label transforms values read from storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Anonymize,
}

impl Transform {
    pub fn apply(&self, field_type: FieldType, _value: &Value) -> Value {
        match self {
            Transform::Anonymize => match field_type {
                FieldType::String => Value::String("xxxxx".into()),
                other => other.empty_value(),
            },
        }
    }
}

/// Policy bound to one custom label.
#[derive(Clone, Debug)]
pub struct LabelPolicy {
    pub transform: Transform,
    /// The transform is skipped when the viewer's path matches.
    pub except_path: Option<Regex>,
}

impl LabelPolicy {
    fn exempts(&self, viewer: &ViewerContext) -> bool {
        match (&self.except_path, &viewer.path) {
            (Some(re), Some(path)) => re.is_match(path),
            _ => false,
        }
    }
}

/// Maps custom label names to their policies.
#[derive(Clone, Debug, Default)]
pub struct PolicySet {
    labels: HashMap<String, LabelPolicy>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: &str, policy: LabelPolicy) {
        self.labels.insert(label.to_string(), policy);
    }

    pub fn get(&self, label: &str) -> Option<&LabelPolicy> {
        self.labels.get(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether `viewer` reads `spec`'s stored value unchanged.
    pub fn reveals(&self, spec: &FieldSpec, viewer: &ViewerContext) -> bool {
        match &spec.label {
            None => true,
            Some(PolicyLabel::Hide) | Some(PolicyLabel::EmptyOnRead) => false,
            Some(PolicyLabel::Custom(name)) => match self.get(name) {
                Some(p) => p.exempts(viewer),
                None => true,
            },
        }
    }

    /// Rejects filters on fields `viewer` cannot read, so match results never
    /// disclose a redacted value. Such fields are reported as `UnknownField`.
    pub fn check_filter(
        &self,
        schema: &EntitySchema,
        filter: &Filter,
        viewer: &ViewerContext,
    ) -> Result<(), AppError> {
        for name in filter.fields() {
            if let Some(spec) = schema.get(name) {
                if !self.reveals(spec, viewer) {
                    tracing::debug!(entity = %schema.name, field = name, "filter on redacted field rejected");
                    return Err(AppError::UnknownField {
                        entity: schema.name.clone(),
                        field: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Redacted projection of `record` for `viewer`. Keys follow the map's
    /// own ordering, not declaration order.
    pub fn project(
        &self,
        record: &Record,
        schema: &EntitySchema,
        viewer: &ViewerContext,
    ) -> OutwardRecord {
        let mut fields = Fields::new();
        for spec in schema.fields() {
            let stored = record.get(&spec.name).unwrap_or(&Value::Null);
            let outward = match &spec.label {
                Some(PolicyLabel::Hide) => continue,
                Some(PolicyLabel::EmptyOnRead) => spec.field_type.empty_value(),
                Some(PolicyLabel::Custom(name)) => match self.get(name) {
                    Some(p) if !p.exempts(viewer) => p.transform.apply(spec.field_type, stored),
                    _ => stored.clone(),
                },
                None => stored.clone(),
            };
            fields.insert(spec.name.clone(), outward);
        }
        OutwardRecord::new(record.id, fields, record.created_at, record.updated_at)
    }
}
