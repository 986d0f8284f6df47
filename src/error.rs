//! Typed errors and HTTP mapping.

use crate::schema::FieldType;
use crate::store::EntityId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate entity declaration: {0}")]
    DuplicateEntity(String),
    #[error("unknown transform '{transform}' for label {label}")]
    UnknownTransform { label: String, transform: String },
    #[error("invalid except_path for label {label}: {source}")]
    InvalidPattern {
        label: String,
        #[source]
        source: regex::Error,
    },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("entity already registered: {0}")]
    DuplicateSchema(String),
    #[error("schema for {0} is frozen")]
    SchemaFrozen(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },
    #[error("missing required field '{field}' on {entity}")]
    MissingField { entity: String, field: String },
    #[error("field '{field}' on {entity} expects {expected}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: FieldType,
    },
    #[error("validation: {0}")]
    Validation(String),
    #[error("unique constraint violated: {entity}.{field}")]
    UniqueConstraintViolation { entity: String, field: String },
    #[error("not found: {entity} {id}")]
    NotFound { entity: String, id: EntityId },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("state lock poisoned")]
    StatePoisoned,
}

impl AppError {
    /// Stable machine-readable code, used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::UnknownEntity(_) => "unknown_entity",
            AppError::DuplicateSchema(_) => "duplicate_schema",
            AppError::SchemaFrozen(_) => "schema_frozen",
            AppError::InvalidSchema(_) => "invalid_schema",
            AppError::UnknownField { .. } => "unknown_field",
            AppError::MissingField { .. } => "missing_field",
            AppError::TypeMismatch { .. } => "type_mismatch",
            AppError::Validation(_) => "validation_error",
            AppError::UniqueConstraintViolation { .. } => "unique_violation",
            AppError::NotFound { .. } => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::StatePoisoned => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownEntity(_) | AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::UnknownField { .. }
            | AppError::MissingField { .. }
            | AppError::TypeMismatch { .. }
            | AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UniqueConstraintViolation { .. }
            | AppError::DuplicateSchema(_)
            | AppError::SchemaFrozen(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::InvalidSchema(_) | AppError::StatePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        AppError::StatePoisoned
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::UniqueConstraintViolation { field, .. }
            | AppError::UnknownField { field, .. }
            | AppError::MissingField { field, .. }
            | AppError::TypeMismatch { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
