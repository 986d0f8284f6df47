//! Persistence engine: in-memory tables keyed by record id, with unique
//! indexes kept in lock-step with the records they protect.
//!
//! Lock order inside a table is always unique indexes (declaration order)
//! first, then the record map. Readers only ever take the record map.

mod record;
mod unique;

pub use record::{EntityId, Fields, Record};

use crate::error::AppError;
use crate::query::{Cursor, Filter};
use crate::schema::EntitySchema;
use crate::service::RequestValidator;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use unique::UniqueIndex;

type Rows = BTreeMap<EntityId, Arc<Record>>;

/// Storage for one entity type. The schema it was created with is the only
/// one its unique indexes line up with.
pub(crate) struct Table {
    schema: Arc<EntitySchema>,
    next_id: AtomicU64,
    rows: RwLock<Rows>,
    unique: Vec<Mutex<UniqueIndex>>,
}

impl Table {
    fn new(schema: &EntitySchema) -> Self {
        Table {
            schema: Arc::new(schema.clone()),
            next_id: AtomicU64::new(1),
            rows: RwLock::new(BTreeMap::new()),
            unique: schema
                .unique_fields()
                .map(|f| Mutex::new(UniqueIndex::new(&f.name)))
                .collect(),
        }
    }

    fn check_schema(&self, schema: &EntitySchema) -> Result<(), AppError> {
        if *self.schema == *schema {
            return Ok(());
        }
        tracing::warn!(entity = %schema.name, "schema differs from the one the table was created with");
        Err(AppError::SchemaFrozen(schema.name.clone()))
    }

    /// First record after `after` (ascending id) satisfying `pred`, found under
    /// one short read lock.
    pub(crate) fn next_matching<F>(
        &self,
        after: Option<EntityId>,
        pred: F,
    ) -> Result<Option<Arc<Record>>, AppError>
    where
        F: Fn(&Record) -> bool,
    {
        let rows = self.rows.read()?;
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(rows
            .range((lower, Bound::Unbounded))
            .map(|(_, r)| r)
            .find(|r| pred(r))
            .cloned())
    }

    fn lock_indexes(&self) -> Result<Vec<MutexGuard<'_, UniqueIndex>>, AppError> {
        self.unique
            .iter()
            .map(|m| m.lock().map_err(AppError::from))
            .collect()
    }

    fn not_found(&self, id: EntityId) -> AppError {
        AppError::NotFound {
            entity: self.schema.name.clone(),
            id,
        }
    }
}

/// All tables, created on first use of each entity type.
#[derive(Default)]
pub struct Store {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table for `schema.name`, created on first use. Fails with
    /// `SchemaFrozen` if `schema` is not the one the table was created with.
    fn table(&self, schema: &EntitySchema) -> Result<Arc<Table>, AppError> {
        let existing = self.tables.read()?.get(&schema.name).cloned();
        let table = match existing {
            Some(t) => t,
            None => self
                .tables
                .write()?
                .entry(schema.name.clone())
                .or_insert_with(|| Arc::new(Table::new(schema)))
                .clone(),
        };
        table.check_schema(schema)?;
        Ok(table)
    }

    /// Validate, check uniqueness, and insert a new record. All-or-nothing.
    pub fn create(&self, schema: &EntitySchema, fields: Fields) -> Result<EntityId, AppError> {
        RequestValidator::validate(schema, &fields)?;
        let fields = normalize(schema, fields);
        let table = self.table(schema)?;

        let mut indexes = table.lock_indexes()?;
        let keys = unique_keys(schema, &fields);
        check_unique(&schema.name, &indexes, &keys, None)?;

        let mut rows = table.rows.write()?;
        let id = EntityId::new(table.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        rows.insert(
            id,
            Arc::new(Record {
                id,
                fields,
                created_at: now,
                updated_at: now,
            }),
        );
        for (idx, key) in indexes.iter_mut().zip(keys) {
            if let Some(k) = key {
                idx.insert(k, id);
            }
        }
        tracing::debug!(entity = %schema.name, id = %id, "record created");
        Ok(id)
    }

    pub fn get(&self, schema: &EntitySchema, id: EntityId) -> Result<Option<Arc<Record>>, AppError> {
        let table = self.table(schema)?;
        let rows = table.rows.read()?;
        Ok(rows.get(&id).cloned())
    }

    /// Merge `patch` over the stored fields, then validate and re-check
    /// uniqueness against every record but this one.
    pub fn update(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        patch: Fields,
    ) -> Result<Arc<Record>, AppError> {
        RequestValidator::validate_patch(schema, &patch)?;
        let table = self.table(schema)?;
        let mut indexes = table.lock_indexes()?;
        let mut rows = table.rows.write()?;
        let current = rows.get(&id).cloned().ok_or_else(|| table.not_found(id))?;
        let mut merged = current.fields.clone();
        for (k, v) in patch {
            merged.insert(k, v);
        }
        let record = commit_replacement(schema, &mut indexes, &mut rows, &current, merged)?;
        tracing::debug!(entity = %schema.name, id = %id, "record updated");
        Ok(record)
    }

    /// Replace every field of an existing record.
    pub fn replace(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        fields: Fields,
    ) -> Result<Arc<Record>, AppError> {
        let table = self.table(schema)?;
        let mut indexes = table.lock_indexes()?;
        let mut rows = table.rows.write()?;
        let current = rows.get(&id).cloned().ok_or_else(|| table.not_found(id))?;
        let record = commit_replacement(schema, &mut indexes, &mut rows, &current, fields)?;
        tracing::debug!(entity = %schema.name, id = %id, "record replaced");
        Ok(record)
    }

    pub fn delete(&self, schema: &EntitySchema, id: EntityId) -> Result<(), AppError> {
        let table = self.table(schema)?;
        let mut indexes = table.lock_indexes()?;
        let mut rows = table.rows.write()?;
        let removed = rows.remove(&id).ok_or_else(|| table.not_found(id))?;
        for (idx, key) in indexes.iter_mut().zip(unique_keys(schema, &removed.fields)) {
            if let Some(k) = key {
                idx.remove(&k, id);
            }
        }
        tracing::debug!(entity = %schema.name, id = %id, "record deleted");
        Ok(())
    }

    /// Open a lazy traversal. Fails with `UnknownField` if the filter names an
    /// undeclared field.
    pub fn cursor(&self, schema: Arc<EntitySchema>, filter: Filter) -> Result<Cursor, AppError> {
        filter.validate(&schema)?;
        let table = self.table(&schema)?;
        tracing::debug!(entity = %schema.name, filter = ?filter, "cursor opened");
        Ok(Cursor::new(table, filter))
    }

    pub fn len(&self, schema: &EntitySchema) -> Result<usize, AppError> {
        let table = self.table(schema)?;
        let rows = table.rows.read()?;
        Ok(rows.len())
    }

    pub fn is_empty(&self, schema: &EntitySchema) -> Result<bool, AppError> {
        Ok(self.len(schema)? == 0)
    }

    /// Number of entries in the unique index of `field` (`None` if the field
    /// is not unique).
    pub fn unique_index_len(&self, schema: &EntitySchema, field: &str) -> Result<Option<usize>, AppError> {
        let table = self.table(schema)?;
        let indexes = table.lock_indexes()?;
        Ok(indexes.iter().find(|i| i.field() == field).map(|i| i.len()))
    }
}

/// Keeps only declared fields; absent optional fields become null.
fn normalize(schema: &EntitySchema, mut fields: Fields) -> Fields {
    schema
        .fields()
        .iter()
        .map(|f| (f.name.clone(), fields.remove(&f.name).unwrap_or(Value::Null)))
        .collect()
}

/// Index keys aligned with `schema.unique_fields()`.
fn unique_keys(schema: &EntitySchema, fields: &Fields) -> Vec<Option<String>> {
    schema
        .unique_fields()
        .map(|f| UniqueIndex::key(fields.get(&f.name)))
        .collect()
}

fn check_unique(
    entity: &str,
    indexes: &[MutexGuard<'_, UniqueIndex>],
    keys: &[Option<String>],
    owner: Option<EntityId>,
) -> Result<(), AppError> {
    for (idx, key) in indexes.iter().zip(keys) {
        if let Some(k) = key {
            if idx.conflicts(k, owner) {
                tracing::debug!(entity, field = idx.field(), "unique constraint violated");
                return Err(AppError::UniqueConstraintViolation {
                    entity: entity.to_string(),
                    field: idx.field().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Validate `fields` as a full record, then swap it in for `current` and move
/// the index entries whose values changed. Nothing is mutated on error.
fn commit_replacement(
    schema: &EntitySchema,
    indexes: &mut [MutexGuard<'_, UniqueIndex>],
    rows: &mut Rows,
    current: &Record,
    fields: Fields,
) -> Result<Arc<Record>, AppError> {
    RequestValidator::validate(schema, &fields)?;
    let fields = normalize(schema, fields);
    let old_keys = unique_keys(schema, &current.fields);
    let new_keys = unique_keys(schema, &fields);
    check_unique(&schema.name, indexes, &new_keys, Some(current.id))?;

    let record = Arc::new(Record {
        id: current.id,
        fields,
        created_at: current.created_at,
        updated_at: Utc::now(),
    });
    rows.insert(current.id, record.clone());
    for ((idx, old), new) in indexes.iter_mut().zip(old_keys).zip(new_keys) {
        if old == new {
            continue;
        }
        if let Some(o) = old {
            idx.remove(&o, current.id);
        }
        if let Some(n) = new {
            idx.insert(n, current.id);
        }
    }
    Ok(record)
}
