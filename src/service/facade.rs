//! EntityService: the public surface a request handler calls.

use crate::config::ResolvedModel;
use crate::error::AppError;
use crate::policy::{OutwardRecord, PolicySet, ViewerContext};
use crate::query::{Cursor, Filter};
use crate::schema::{EntitySchema, Persistable, SchemaRegistry};
use crate::store::{EntityId, Fields, Store};
use serde_json::Value;
use std::sync::Arc;

/// Composes registry, store, cursors and policies. Every read goes through
/// the policy set exactly once before it leaves.
pub struct EntityService {
    registry: Arc<SchemaRegistry>,
    store: Store,
    policies: PolicySet,
}

impl EntityService {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_policies(registry, PolicySet::default())
    }

    pub fn with_policies(registry: Arc<SchemaRegistry>, policies: PolicySet) -> Self {
        EntityService {
            registry,
            store: Store::new(),
            policies,
        }
    }

    /// Register every schema of a resolved model into a fresh registry.
    pub fn from_model(model: ResolvedModel) -> Result<Self, AppError> {
        let registry = Arc::new(SchemaRegistry::new());
        for schema in model.schemas {
            registry.register(schema)?;
        }
        Ok(Self::with_policies(registry, model.policies))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn schema(&self, entity: &str) -> Result<Arc<EntitySchema>, AppError> {
        self.registry.lookup(entity)
    }

    pub fn create(&self, entity: &str, fields: Fields) -> Result<EntityId, AppError> {
        let schema = self.registry.lookup(entity)?;
        self.store.create(&schema, fields)
    }

    /// Fetch by id. Absence is `Ok(None)`, not an error.
    pub fn get(
        &self,
        entity: &str,
        id: EntityId,
        viewer: &ViewerContext,
    ) -> Result<Option<OutwardRecord>, AppError> {
        let schema = self.registry.lookup(entity)?;
        let record = self.store.get(&schema, id)?;
        Ok(record.map(|r| self.policies.project(&r, &schema, viewer)))
    }

    /// First record (lowest id) matching `filter`. Like `cursor`, the filter
    /// may only name fields the viewer can read.
    pub fn find_one(
        &self,
        entity: &str,
        filter: Filter,
        viewer: &ViewerContext,
    ) -> Result<Option<OutwardRecord>, AppError> {
        let mut cursor = self.cursor(entity, filter, viewer.clone())?;
        cursor.next().transpose()
    }

    /// Open a projected cursor. Filters on `Hide`, `EmptyOnRead`, or
    /// policy-bound fields the viewer cannot read fail with `UnknownField`.
    pub fn cursor(
        &self,
        entity: &str,
        filter: Filter,
        viewer: ViewerContext,
    ) -> Result<EntityCursor<'_>, AppError> {
        let schema = self.registry.lookup(entity)?;
        self.policies.check_filter(&schema, &filter, &viewer)?;
        let inner = self.store.cursor(schema.clone(), filter)?;
        Ok(EntityCursor {
            inner,
            schema,
            policies: &self.policies,
            viewer,
        })
    }

    pub fn count(&self, entity: &str) -> Result<usize, AppError> {
        let schema = self.registry.lookup(entity)?;
        self.store.len(&schema)
    }

    pub fn update(&self, entity: &str, id: EntityId, patch: Fields) -> Result<(), AppError> {
        let schema = self.registry.lookup(entity)?;
        self.store.update(&schema, id, patch).map(|_| ())
    }

    pub fn replace(&self, entity: &str, id: EntityId, fields: Fields) -> Result<(), AppError> {
        let schema = self.registry.lookup(entity)?;
        self.store.replace(&schema, id, fields).map(|_| ())
    }

    pub fn delete(&self, entity: &str, id: EntityId) -> Result<(), AppError> {
        let schema = self.registry.lookup(entity)?;
        self.store.delete(&schema, id)
    }

    /// Register the schema paired with `T`.
    pub fn register_type<T: Persistable>(&self) -> Result<Arc<EntitySchema>, AppError> {
        self.registry.register(T::entity_schema())
    }

    /// Persist a typed value; its serialized fields go through `create`.
    pub fn insert<T: Persistable>(&self, value: &T) -> Result<EntityId, AppError> {
        let fields = match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(AppError::BadRequest(format!(
                    "{} must serialize to an object",
                    T::entity_name()
                )))
            }
            Err(e) => return Err(AppError::BadRequest(e.to_string())),
        };
        self.create(T::entity_name(), fields)
    }
}

/// A store cursor whose records are projected for one viewer as they are
/// pulled. Nothing is materialized until `next` or `to_array` is called.
pub struct EntityCursor<'a> {
    inner: Cursor,
    schema: Arc<EntitySchema>,
    policies: &'a PolicySet,
    viewer: ViewerContext,
}

impl EntityCursor<'_> {
    /// Begin a fresh traversal.
    pub fn restart(&mut self) {
        self.inner.restart();
    }

    /// Drain eagerly. O(n) in match count.
    pub fn to_array(self) -> Result<Vec<OutwardRecord>, AppError> {
        self.collect()
    }
}

impl Iterator for EntityCursor<'_> {
    type Item = Result<OutwardRecord, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.inner.next_record() {
            Ok(Some(r)) => r,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(self.policies.project(&record, &self.schema, &self.viewer)))
    }
}
