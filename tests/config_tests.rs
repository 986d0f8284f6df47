use entity_core::config::{from_json_str, ENTITIES_FILE, POLICIES_FILE};
use entity_core::{
    load_from_dir, resolve, ConfigError, EntityId, EntityService, FieldType, PolicyLabel, ViewerContext,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const ENTITIES: &str = r#"[
  {
    "name": "User",
    "fields": [
      { "name": "username", "type": "string", "unique": true,
        "validation": { "min_length": 1, "max_length": 8 } },
      { "name": "email", "type": "string", "optional": true, "label": "pii" },
      { "name": "password", "type": "string", "label": "hide" },
      { "name": "uploadedKey", "type": "string", "optional": true, "label": "empty" }
    ]
  }
]"#;

const POLICIES: &str = r#"{
  "labels": [
    { "name": "pii", "transform": "anonymize", "except_path": "^/api/v1/admin" }
  ]
}"#;

// ── resolve ──────────────────────────────────────────────────────

#[test]
fn resolves_fields_and_labels() {
    let model = resolve(&from_json_str(ENTITIES, Some(POLICIES)).unwrap()).unwrap();
    let user = model.schema("User").unwrap();
    let username = user.get("username").unwrap();
    assert!(username.unique);
    assert!(username.required);
    assert_eq!(username.field_type, FieldType::String);
    assert_eq!(user.get("password").unwrap().label, Some(PolicyLabel::Hide));
    assert_eq!(user.get("uploadedKey").unwrap().label, Some(PolicyLabel::EmptyOnRead));
    assert!(!user.get("email").unwrap().required);
    assert_eq!(model.policies.len(), 1);
}

#[test]
fn resolved_model_drives_a_service() {
    let model = resolve(&from_json_str(ENTITIES, Some(POLICIES)).unwrap()).unwrap();
    let service = EntityService::from_model(model).unwrap();
    let mut body = serde_json::Map::new();
    body.insert("username".into(), json!("ann"));
    body.insert("email".into(), json!("ann@x.io"));
    body.insert("password".into(), json!("pw"));
    body.insert("uploadedKey".into(), json!("key"));
    let id = service.create("User", body).unwrap();
    assert_eq!(id, EntityId::new(1));

    let public = service
        .get("User", id, &ViewerContext::for_path("/api/v1/User/1"))
        .unwrap()
        .unwrap();
    assert_eq!(
        public.to_json(),
        json!({"id": 1, "username": "ann", "email": "xxxxx", "uploadedKey": ""})
    );

    let admin = service
        .get("User", id, &ViewerContext::for_path("/api/v1/admin/User/1"))
        .unwrap()
        .unwrap();
    assert_eq!(admin.get("email"), Some(&json!("ann@x.io")));
}

#[test]
fn validation_rules_from_config_are_enforced() {
    let model = resolve(&from_json_str(ENTITIES, None).unwrap()).unwrap();
    let service = EntityService::from_model(model).unwrap();
    let mut body = serde_json::Map::new();
    body.insert("username".into(), json!("much-too-long"));
    body.insert("password".into(), json!("pw"));
    assert!(matches!(
        service.create("User", body),
        Err(entity_core::AppError::Validation(_))
    ));
}

#[test]
fn duplicate_entity_is_rejected() {
    let entities = r#"[{"name": "A", "fields": []}, {"name": "A", "fields": []}]"#;
    let err = resolve(&from_json_str(entities, None).unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateEntity(name) if name == "A"));
}

#[test]
fn reserved_and_duplicate_fields_are_rejected() {
    let reserved = r#"[{"name": "A", "fields": [{"name": "id", "type": "integer"}]}]"#;
    assert!(matches!(
        resolve(&from_json_str(reserved, None).unwrap()),
        Err(ConfigError::Validation(_))
    ));
    let dup = r#"[{"name": "A", "fields": [
        {"name": "x", "type": "string"}, {"name": "x", "type": "string"}]}]"#;
    assert!(matches!(
        resolve(&from_json_str(dup, None).unwrap()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn unknown_transform_is_rejected() {
    let policies = r#"{"labels": [{"name": "pii", "transform": "shred"}]}"#;
    let err = resolve(&from_json_str(ENTITIES, Some(policies)).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnknownTransform { ref transform, .. } if transform == "shred"
    ));
}

#[test]
fn bad_except_path_is_rejected() {
    let policies = r#"{"labels": [{"name": "pii", "transform": "anonymize", "except_path": "("}]}"#;
    assert!(matches!(
        resolve(&from_json_str(ENTITIES, Some(policies)).unwrap()),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[test]
fn builtin_labels_cannot_be_rebound() {
    let policies = r#"{"labels": [{"name": "hide", "transform": "anonymize"}]}"#;
    assert!(matches!(
        resolve(&from_json_str(ENTITIES, Some(policies)).unwrap()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn field_patterns_compile_at_load_time() {
    let bad = r#"[{"name": "A", "fields": [
        {"name": "code", "type": "string", "validation": {"pattern": "("}}]}]"#;
    assert!(matches!(from_json_str(bad, None), Err(ConfigError::Load(_))));

    let good = r#"[{"name": "A", "fields": [
        {"name": "code", "type": "string", "validation": {"pattern": "^[A-Z]{3}$"}}]}]"#;
    let service = EntityService::from_model(resolve(&from_json_str(good, None).unwrap()).unwrap()).unwrap();
    let mut ok = serde_json::Map::new();
    ok.insert("code".into(), json!("ABC"));
    assert!(service.create("A", ok).is_ok());
    let mut bad_value = serde_json::Map::new();
    bad_value.insert("code".into(), json!("abc"));
    assert!(matches!(
        service.create("A", bad_value),
        Err(entity_core::AppError::Validation(_))
    ));
}

#[test]
fn malformed_json_is_a_load_error() {
    assert!(matches!(from_json_str("{not json", None), Err(ConfigError::Load(_))));
}

// ── load_from_dir ────────────────────────────────────────────────

#[test]
fn loads_both_files_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(ENTITIES_FILE), ENTITIES).unwrap();
    std::fs::write(dir.path().join(POLICIES_FILE), POLICIES).unwrap();
    let config = load_from_dir(dir.path()).unwrap();
    assert_eq!(config.entities.len(), 1);
    assert_eq!(config.policies.labels.len(), 1);
}

#[test]
fn policies_file_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(ENTITIES_FILE), ENTITIES).unwrap();
    let config = load_from_dir(dir.path()).unwrap();
    assert!(config.policies.labels.is_empty());
}

#[test]
fn entities_file_is_required() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(load_from_dir(dir.path()), Err(ConfigError::Load(_))));
}
