//! Process-scoped registry of entity schemas.

use crate::error::AppError;
use crate::schema::{EntitySchema, FieldSpec, ID_FIELD};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

/// Holds every registered entity type. Populated by `register` calls at
/// startup; a schema never changes once registered.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<BTreeMap<String, Arc<EntitySchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, schema: EntitySchema) -> Result<Arc<EntitySchema>, AppError> {
        check_shape(&schema)?;
        let mut guard = self.schemas.write()?;
        if guard.contains_key(&schema.name) {
            return Err(AppError::DuplicateSchema(schema.name));
        }
        let schema = Arc::new(schema);
        guard.insert(schema.name.clone(), schema.clone());
        tracing::debug!(entity = %schema.name, fields = schema.fields().len(), "schema registered");
        Ok(schema)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<EntitySchema>, AppError> {
        self.schemas
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas
            .read()
            .map(|g| g.contains_key(name))
            .unwrap_or(false)
    }

    pub fn entity_names(&self) -> Result<Vec<String>, AppError> {
        Ok(self.schemas.read()?.keys().cloned().collect())
    }

    /// Registered schemas are frozen: always fails once the entity exists.
    pub fn add_field(&self, entity: &str, field: FieldSpec) -> Result<(), AppError> {
        self.lookup(entity)?;
        tracing::warn!(entity, field = %field.name, "rejected field addition on frozen schema");
        Err(AppError::SchemaFrozen(entity.to_string()))
    }

    /// Registered schemas are frozen: always fails once the entity exists.
    pub fn remove_field(&self, entity: &str, field: &str) -> Result<(), AppError> {
        self.lookup(entity)?;
        tracing::warn!(entity, field, "rejected field removal on frozen schema");
        Err(AppError::SchemaFrozen(entity.to_string()))
    }
}

fn check_shape(schema: &EntitySchema) -> Result<(), AppError> {
    if schema.name.trim().is_empty() {
        return Err(AppError::InvalidSchema("entity name must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for f in schema.fields() {
        if f.name.trim().is_empty() {
            return Err(AppError::InvalidSchema(format!(
                "{}: field name must not be empty",
                schema.name
            )));
        }
        if f.name == ID_FIELD {
            return Err(AppError::InvalidSchema(format!(
                "{}: '{}' is reserved",
                schema.name, ID_FIELD
            )));
        }
        if !seen.insert(f.name.as_str()) {
            return Err(AppError::InvalidSchema(format!(
                "{}: duplicate field '{}'",
                schema.name, f.name
            )));
        }
    }
    Ok(())
}
