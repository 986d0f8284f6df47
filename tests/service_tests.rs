mod common;

use common::{fields, user_service};
use entity_core::{
    AppError, EntityId, EntitySchema, FieldSpec, Filter, Persistable, SchemaRegistry, EntityService,
    ViewerContext,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

// ── user scenario ────────────────────────────────────────────────

#[test]
fn create_duplicate_then_read_back() {
    let service = user_service();
    let viewer = ViewerContext::anonymous();

    let id = service
        .create("User", fields(json!({"username": "a", "password": "x"})))
        .unwrap();
    assert_eq!(id, EntityId::new(1));

    let dup = service.create("User", fields(json!({"username": "a", "password": "y"})));
    assert!(matches!(dup, Err(AppError::UniqueConstraintViolation { .. })));

    let out = service.get("User", id, &viewer).unwrap().unwrap();
    assert_eq!(out.to_json(), json!({"id": 1, "username": "a"}));
    assert_eq!(service.count("User").unwrap(), 1);
}

#[test]
fn to_array_lists_every_user_in_id_order() {
    let service = user_service();
    for name in ["c", "a", "b"] {
        service
            .create("User", fields(json!({"username": name, "password": "p"})))
            .unwrap();
    }
    let rows = service
        .cursor("User", Filter::All, ViewerContext::anonymous())
        .unwrap()
        .to_array()
        .unwrap();
    let got: Vec<_> = rows.iter().map(|r| r.to_json()).collect();
    assert_eq!(
        got,
        vec![
            json!({"id": 1, "username": "c"}),
            json!({"id": 2, "username": "a"}),
            json!({"id": 3, "username": "b"}),
        ]
    );
}

#[test]
fn find_one_returns_lowest_matching_id() {
    let service = user_service();
    for name in ["a", "b", "c"] {
        service
            .create("User", fields(json!({"username": name, "password": "p"})))
            .unwrap();
    }
    let viewer = ViewerContext::anonymous();
    let hit = service
        .find_one("User", Filter::ne("username", "a"), &viewer)
        .unwrap()
        .unwrap();
    assert_eq!(hit.id, EntityId::new(2));
    assert!(service
        .find_one("User", Filter::eq("username", "zzz"), &viewer)
        .unwrap()
        .is_none());
}

#[test]
fn entity_cursor_restart() {
    let service = user_service();
    for name in ["a", "b"] {
        service
            .create("User", fields(json!({"username": name, "password": "p"})))
            .unwrap();
    }
    let mut cursor = service
        .cursor("User", Filter::All, ViewerContext::anonymous())
        .unwrap();
    assert_eq!(cursor.next().unwrap().unwrap().id, EntityId::new(1));
    cursor.restart();
    assert_eq!(cursor.to_array().unwrap().len(), 2);
}

#[test]
fn get_absent_is_none_not_error() {
    let service = user_service();
    assert!(service
        .get("User", EntityId::new(1), &ViewerContext::anonymous())
        .unwrap()
        .is_none());
}

#[test]
fn unknown_entity_is_reported_by_every_operation() {
    let service = user_service();
    let viewer = ViewerContext::anonymous();
    assert!(matches!(
        service.create("Ghost", fields(json!({}))),
        Err(AppError::UnknownEntity(_))
    ));
    assert!(matches!(
        service.get("Ghost", EntityId::new(1), &viewer),
        Err(AppError::UnknownEntity(_))
    ));
    assert!(service.cursor("Ghost", Filter::All, viewer).is_err());
    assert!(matches!(service.count("Ghost"), Err(AppError::UnknownEntity(_))));
}

#[test]
fn update_replace_delete_round_trip() {
    let service = user_service();
    let viewer = ViewerContext::anonymous();
    let id = service
        .create("User", fields(json!({"username": "a", "password": "p"})))
        .unwrap();

    service.update("User", id, fields(json!({"username": "b"}))).unwrap();
    assert_eq!(
        service.get("User", id, &viewer).unwrap().unwrap().get("username"),
        Some(&json!("b"))
    );

    service
        .replace("User", id, fields(json!({"username": "c", "password": "q"})))
        .unwrap();
    assert_eq!(
        service.get("User", id, &viewer).unwrap().unwrap().get("username"),
        Some(&json!("c"))
    );

    service.delete("User", id).unwrap();
    assert!(service.get("User", id, &viewer).unwrap().is_none());
    assert!(matches!(service.delete("User", id), Err(AppError::NotFound { .. })));
}

#[test]
fn entity_types_are_isolated() {
    let registry = Arc::new(SchemaRegistry::new());
    for name in ["Left", "Right"] {
        registry
            .register(EntitySchema::new(name).field(FieldSpec::string("key").unique()))
            .unwrap();
    }
    let service = EntityService::new(registry);
    let l = service.create("Left", fields(json!({"key": "k"}))).unwrap();
    let r = service.create("Right", fields(json!({"key": "k"}))).unwrap();
    assert_eq!(l, EntityId::new(1));
    assert_eq!(r, EntityId::new(1));
}

// ── typed entities ───────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Member {
    handle: String,
    #[serde(default)]
    secret: String,
    level: i64,
}

impl Persistable for Member {
    fn entity_name() -> &'static str {
        "Member"
    }

    fn entity_schema() -> EntitySchema {
        EntitySchema::new("Member")
            .field(FieldSpec::string("handle").unique())
            .field(FieldSpec::string("secret").hidden())
            .field(FieldSpec::integer("level"))
    }
}

#[test]
fn typed_insert_and_decode() {
    let service = EntityService::new(Arc::new(SchemaRegistry::new()));
    service.register_type::<Member>().unwrap();

    let member = Member {
        handle: "neo".into(),
        secret: "red pill".into(),
        level: 3,
    };
    let id = service.insert(&member).unwrap();
    let out = service.get("Member", id, &ViewerContext::anonymous()).unwrap().unwrap();
    let decoded: Member = out.decode().unwrap();
    assert_eq!(
        decoded,
        Member {
            handle: "neo".into(),
            secret: String::new(),
            level: 3,
        }
    );

    assert!(matches!(
        service.insert(&member),
        Err(AppError::UniqueConstraintViolation { .. })
    ));
}

#[test]
fn registering_a_type_twice_fails() {
    let service = EntityService::new(Arc::new(SchemaRegistry::new()));
    service.register_type::<Member>().unwrap();
    assert!(matches!(
        service.register_type::<Member>(),
        Err(AppError::DuplicateSchema(_))
    ));
}
