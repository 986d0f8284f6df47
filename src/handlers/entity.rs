//! Entity handlers: create, read, update, replace, delete, list.

use crate::error::AppError;
use crate::policy::ViewerContext;
use crate::query::Filter;
use crate::response::{success_many, success_one, success_one_ok};
use crate::schema::{FieldType, ID_FIELD};
use crate::state::AppState;
use crate::store::{EntityId, Fields};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

fn parse_id(id_str: &str) -> Result<EntityId, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn body_to_map(value: Value) -> Result<Fields, AppError> {
    match value {
        Value::Object(mut m) => {
            m.remove(ID_FIELD);
            Ok(m)
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Query strings are untyped; read the value the way the field is declared.
fn query_value(field_type: Option<FieldType>, s: &str) -> Value {
    match field_type {
        None | Some(FieldType::Integer) => {
            if let Ok(n) = s.parse::<i64>() {
                return Value::Number(n.into());
            }
        }
        Some(FieldType::Number) => {
            if let Some(n) = s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
        Some(FieldType::Boolean) => {
            if s.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if s.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        Some(FieldType::String) | Some(FieldType::Json) => {}
    }
    Value::String(s.to_string())
}

pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let schema = state.service.schema(&entity)?;

    let mut limit = DEFAULT_LIMIT;
    let mut offset = 0usize;
    let mut filter = Filter::All;
    for (k, v) in params {
        match k.as_str() {
            "limit" => {
                limit = v.parse().unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
            }
            "offset" => {
                offset = v.parse().unwrap_or(0);
            }
            _ => {
                // `id` has no spec and reads as an integer.
                let field_type = schema.get(&k).map(|f| f.field_type);
                let val = query_value(field_type, &v);
                filter = filter.and(Filter::Eq(k, val));
            }
        }
    }

    let viewer = ViewerContext::for_path(uri.path());
    let cursor = state.service.cursor(&entity, filter, viewer)?;
    let rows = cursor
        .skip(offset)
        .take(limit)
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(success_many(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let id = state.service.create(&entity, body)?;
    Ok(success_one(serde_json::json!({ "id": id })))
}

pub async fn read(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let viewer = ViewerContext::for_path(uri.path());
    let record = state
        .service
        .get(&entity, id, &viewer)?
        .ok_or_else(|| AppError::NotFound { entity: entity.clone(), id })?;
    let meta = serde_json::json!({
        "created_at": record.created_at().to_rfc3339(),
        "updated_at": record.updated_at().to_rfc3339(),
    });
    Ok(success_one_ok(record, Some(meta)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    state.service.update(&entity, id, body)?;
    let viewer = ViewerContext::for_path(uri.path());
    let record = state
        .service
        .get(&entity, id, &viewer)?
        .ok_or_else(|| AppError::NotFound { entity: entity.clone(), id })?;
    Ok(success_one_ok(record, None))
}

pub async fn replace(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    state.service.replace(&entity, id, body)?;
    let viewer = ViewerContext::for_path(uri.path());
    let record = state
        .service
        .get(&entity, id, &viewer)?
        .ok_or_else(|| AppError::NotFound { entity: entity.clone(), id })?;
    Ok(success_one_ok(record, None))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((entity, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    state.service.delete(&entity, id)?;
    Ok(StatusCode::NO_CONTENT)
}
