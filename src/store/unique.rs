//! Unique index: value of one field → id of the record holding it.

use crate::store::EntityId;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct UniqueIndex {
    field: String,
    entries: HashMap<String, EntityId>,
}

impl UniqueIndex {
    pub(crate) fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            entries: HashMap::new(),
        }
    }

    pub(crate) fn field(&self) -> &str {
        &self.field
    }

    /// Canonical key for a value; nulls are never indexed.
    pub(crate) fn key(v: Option<&Value>) -> Option<String> {
        match v {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.to_string()),
        }
    }

    pub(crate) fn holder(&self, key: &str) -> Option<EntityId> {
        self.entries.get(key).copied()
    }

    /// True if another record than `owner` already holds `key`.
    pub(crate) fn conflicts(&self, key: &str, owner: Option<EntityId>) -> bool {
        match self.holder(key) {
            Some(holder) => Some(holder) != owner,
            None => false,
        }
    }

    pub(crate) fn insert(&mut self, key: String, id: EntityId) {
        self.entries.insert(key, id);
    }

    /// Removes `key` only if it still points at `id`.
    pub(crate) fn remove(&mut self, key: &str, id: EntityId) {
        if self.holder(key) == Some(id) {
            self.entries.remove(key);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
