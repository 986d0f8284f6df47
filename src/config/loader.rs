//! Load declarations from in-memory structs, JSON strings, or a config directory.

use crate::config::resolved::ResolvedModel;
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::policy::{LabelPolicy, PolicySet, Transform};
use crate::schema::{EntitySchema, FieldSpec, PolicyLabel};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

pub const ENTITIES_FILE: &str = "entities.json";
pub const POLICIES_FILE: &str = "policies.json";

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut policies = PolicySet::new();
    for label in &config.policies.labels {
        let transform = match label.transform.as_deref() {
            Some("anonymize") => Transform::Anonymize,
            Some(other) => {
                return Err(ConfigError::UnknownTransform {
                    label: label.name.clone(),
                    transform: other.to_string(),
                })
            }
            None => continue,
        };
        let except_path = label
            .except_path
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|source| ConfigError::InvalidPattern {
                label: label.name.clone(),
                source,
            })?;
        tracing::debug!(label = %label.name, "applying policy for label");
        policies.insert(
            &label.name,
            LabelPolicy {
                transform,
                except_path,
            },
        );
    }

    let declared_labels: HashSet<&str> = config.policies.labels.iter().map(|l| l.name.as_str()).collect();
    let mut schemas = Vec::with_capacity(config.entities.len());
    for e in &config.entities {
        let fields = e
            .fields
            .iter()
            .map(|f| {
                let label = f.label.as_deref().map(PolicyLabel::from_name);
                if let Some(PolicyLabel::Custom(name)) = &label {
                    if !declared_labels.contains(name.as_str()) {
                        tracing::warn!(
                            "{}.{}: label '{}' has no policy; values pass through",
                            e.name,
                            f.name,
                            name
                        );
                    }
                }
                FieldSpec {
                    name: f.name.clone(),
                    field_type: f.type_,
                    unique: f.unique,
                    required: !f.optional,
                    label,
                    validation: f.validation.clone(),
                }
            })
            .collect();
        schemas.push(EntitySchema::with_fields(&e.name, fields));
    }

    Ok(ResolvedModel { schemas, policies })
}

/// Parse entities.json and (optionally) policies.json contents.
pub fn from_json_str(entities: &str, policies: Option<&str>) -> Result<FullConfig, ConfigError> {
    let entities: Vec<EntityConfig> =
        serde_json::from_str(entities).map_err(|e| ConfigError::Load(format!("{}: {}", ENTITIES_FILE, e)))?;
    let policies = match policies {
        Some(s) => serde_json::from_str(s).map_err(|e| ConfigError::Load(format!("{}: {}", POLICIES_FILE, e)))?,
        None => PolicyConfig::default(),
    };
    Ok(FullConfig { entities, policies })
}

/// Read entities.json (required) and policies.json (optional) from `dir`.
pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let dir = dir.as_ref();
    let entities_path = dir.join(ENTITIES_FILE);
    let entities = std::fs::read_to_string(&entities_path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", entities_path.display(), e)))?;
    let policies_path = dir.join(POLICIES_FILE);
    let policies = match std::fs::read_to_string(&policies_path) {
        Ok(s) => Some(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(ConfigError::Load(format!("{}: {}", policies_path.display(), e))),
    };
    tracing::debug!(dir = %dir.display(), has_policies = policies.is_some(), "loading config");
    from_json_str(&entities, policies.as_deref())
}
