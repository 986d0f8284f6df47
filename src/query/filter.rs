//! Filter predicates over record fields.
//!
//! No type coercion: numbers compare numerically, strings lexicographically,
//! anything else (including null) never satisfies an ordering comparison.

use crate::error::AppError;
use crate::schema::{EntitySchema, ID_FIELD};
use crate::store::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches every record.
    #[default]
    All,
    Eq(String, Value),
    Ne(String, Value),
    Lt(String, Value),
    Le(String, Value),
    Gt(String, Value),
    Ge(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, v: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), v.into())
    }

    pub fn ne(field: &str, v: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), v.into())
    }

    pub fn lt(field: &str, v: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), v.into())
    }

    pub fn le(field: &str, v: impl Into<Value>) -> Self {
        Filter::Le(field.into(), v.into())
    }

    pub fn gt(field: &str, v: impl Into<Value>) -> Self {
        Filter::Gt(field.into(), v.into())
    }

    pub fn ge(field: &str, v: impl Into<Value>) -> Self {
        Filter::Ge(field.into(), v.into())
    }

    /// Conjunction; flattens nested `And`s and drops `All`.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Filter::All => {}
                Filter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Filter::All,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Every field name the filter references.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Filter::All => Vec::new(),
            Filter::Eq(f, _)
            | Filter::Ne(f, _)
            | Filter::Lt(f, _)
            | Filter::Le(f, _)
            | Filter::Gt(f, _)
            | Filter::Ge(f, _) => vec![f.as_str()],
            Filter::And(parts) => parts.iter().flat_map(|p| p.fields()).collect(),
        }
    }

    /// Rejects references to undeclared fields. `id` is always allowed.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), AppError> {
        for f in self.fields() {
            if f != ID_FIELD && !schema.has_field(f) {
                return Err(AppError::UnknownField {
                    entity: schema.name.clone(),
                    field: f.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(f, v) => field_value(record, f) == *v,
            Filter::Ne(f, v) => field_value(record, f) != *v,
            Filter::Lt(f, v) => compare(&field_value(record, f), v) == Some(Ordering::Less),
            Filter::Le(f, v) => matches!(
                compare(&field_value(record, f), v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::Gt(f, v) => compare(&field_value(record, f), v) == Some(Ordering::Greater),
            Filter::Ge(f, v) => matches!(
                compare(&field_value(record, f), v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }
}

fn field_value(record: &Record, field: &str) -> Value {
    if field == ID_FIELD {
        return Value::Number(record.id.get().into());
    }
    record.get(field).cloned().unwrap_or(Value::Null)
}

fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
