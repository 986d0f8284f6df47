//! Field validation against the registered schema and per-field rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use crate::schema::{EntitySchema, FieldSpec};
use crate::store::Fields;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full record: no undeclared fields, every required field
    /// present and non-null, types and rules respected.
    pub fn validate(schema: &EntitySchema, fields: &Fields) -> Result<(), AppError> {
        reject_unknown(schema, fields)?;
        for spec in schema.fields() {
            match fields.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(AppError::MissingField {
                        entity: schema.name.clone(),
                        field: spec.name.clone(),
                    });
                }
                Some(v) => validate_field(schema, spec, v)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Validate only the fields present (for partial updates). Required is
    /// checked later, against the merged record.
    pub fn validate_patch(schema: &EntitySchema, patch: &Fields) -> Result<(), AppError> {
        reject_unknown(schema, patch)?;
        for (name, v) in patch {
            if let Some(spec) = schema.get(name) {
                validate_field(schema, spec, v)?;
            }
        }
        Ok(())
    }
}

fn reject_unknown(schema: &EntitySchema, fields: &Fields) -> Result<(), AppError> {
    match fields.keys().find(|k| !schema.has_field(k)) {
        Some(k) => Err(AppError::UnknownField {
            entity: schema.name.clone(),
            field: k.clone(),
        }),
        None => Ok(()),
    }
}

fn validate_field(schema: &EntitySchema, spec: &FieldSpec, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if !spec.field_type.accepts(v) {
        return Err(AppError::TypeMismatch {
            entity: schema.name.clone(),
            field: spec.name.clone(),
            expected: spec.field_type,
        });
    }
    match &spec.validation {
        Some(rule) => validate_rule(&spec.name, v, rule),
        None => Ok(()),
    }
}

fn validate_rule(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    match rule_violation(v, rule) {
        Some(reason) => Err(AppError::Validation(format!("{} {}", col, reason))),
        None => Ok(()),
    }
}

/// First rule `v` breaks, phrased to follow the field name.
fn rule_violation(v: &Value, rule: &ValidationRule) -> Option<String> {
    if let Some(format) = &rule.format {
        if let Some(reason) = format_violation(v, format) {
            return Some(reason);
        }
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length.filter(|&m| len > m as usize) {
            return Some(format!("must be at most {} characters", max));
        }
        if let Some(min) = rule.min_length.filter(|&m| len < m as usize) {
            return Some(format!("must be at least {} characters", min));
        }
        if let Some(p) = rule.pattern.as_ref().filter(|p| !p.is_match(s)) {
            return Some(format!("does not match pattern {}", p));
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let shown: Vec<String> = allowed.iter().take(5).map(Value::to_string).collect();
            return Some(format!("must be one of: {}", shown.join(", ")));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum.filter(|&m| n < m) {
            return Some(format!("must be at least {}", min));
        }
        if let Some(max) = rule.maximum.filter(|&m| n > m) {
            return Some(format!("must be at most {}", max));
        }
    }
    None
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

/// Only string values are format-checked; unknown formats accept anything.
fn format_violation(v: &Value, format: &str) -> Option<String> {
    let s = v.as_str()?;
    let ok = match format.to_ascii_lowercase().as_str() {
        "email" => s.len() >= 3 && s.contains('@'),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    };
    (!ok).then(|| format!("must be a valid {}", format))
}
