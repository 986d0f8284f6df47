//! Config validation: naming, label bindings and policy patterns.
//! Field `pattern` regexes are already compiled by the time this runs.

use crate::config::FullConfig;
use crate::error::ConfigError;
use crate::schema::ID_FIELD;
use regex::Regex;
use std::collections::HashSet;

/// Label names with built-in meaning; policies.json may not rebind them.
pub const BUILTIN_LABELS: &[&str] = &["hide", "empty", "empty_on_read"];

pub const KNOWN_TRANSFORMS: &[&str] = &["anonymize"];

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut entity_names = HashSet::new();
    for e in &config.entities {
        if e.name.trim().is_empty() {
            return Err(ConfigError::Validation("entity name must not be empty".into()));
        }
        if !entity_names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(e.name.clone()));
        }
        let mut field_names = HashSet::new();
        for f in &e.fields {
            if f.name == ID_FIELD {
                return Err(ConfigError::Validation(format!(
                    "{}: field name '{}' is reserved",
                    e.name, ID_FIELD
                )));
            }
            if !field_names.insert(f.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: duplicate field '{}'",
                    e.name, f.name
                )));
            }
        }
    }

    let mut label_names = HashSet::new();
    for label in &config.policies.labels {
        if BUILTIN_LABELS.contains(&label.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "label '{}' is built in and cannot be rebound",
                label.name
            )));
        }
        if !label_names.insert(label.name.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate label: {}", label.name)));
        }
        if let Some(t) = &label.transform {
            if !KNOWN_TRANSFORMS.contains(&t.as_str()) {
                return Err(ConfigError::UnknownTransform {
                    label: label.name.clone(),
                    transform: t.clone(),
                });
            }
        }
        if let Some(p) = &label.except_path {
            Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                label: label.name.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
