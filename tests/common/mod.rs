//! Shared test helpers for entity-core tests.

#![allow(dead_code)]

use entity_core::{EntitySchema, EntityService, FieldSpec, Fields, SchemaRegistry};
use serde_json::Value;
use std::sync::Arc;

/// Turns a `json!({...})` literal into a field map.
pub fn fields(v: Value) -> Fields {
    match v {
        Value::Object(m) => m,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// `User{username: string unique, password: string Hide}`.
pub fn user_schema() -> EntitySchema {
    EntitySchema::new("User")
        .field(FieldSpec::string("username").unique())
        .field(FieldSpec::string("password").hidden())
}

/// The user model with an extra `EmptyOnRead` key and an optional unique email.
pub fn account_schema() -> EntitySchema {
    EntitySchema::new("Account")
        .field(FieldSpec::string("username").unique())
        .field(FieldSpec::string("email").unique().optional())
        .field(FieldSpec::string("password").hidden())
        .field(FieldSpec::string("uploadedKey").empty_on_read())
        .field(FieldSpec::integer("age").optional())
}

pub fn service_with(schemas: Vec<EntitySchema>) -> EntityService {
    let registry = Arc::new(SchemaRegistry::new());
    for s in schemas {
        registry.register(s).expect("register schema");
    }
    EntityService::new(registry)
}

pub fn user_service() -> EntityService {
    service_with(vec![user_schema()])
}
