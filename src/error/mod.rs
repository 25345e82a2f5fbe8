//! Application error types for robust error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors.
///
/// Validation and authorization failures short-circuit before a handler
/// runs; handler failures surface without retry.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed")]
    Validation(validator::ValidationErrors),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request canceled")]
    Canceled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a single named field, for checks that fall
    /// outside the derive-based payload validation.
    pub fn field(field: &'static str, message: &str) -> Self {
        let mut errors = validator::ValidationErrors::new();
        let mut err = validator::ValidationError::new("invalid");
        err.message = Some(std::borrow::Cow::Owned(message.to_string()));
        errors.add(field, err);
        AppError::Validation(errors)
    }
}

/// Flatten validation errors into `field -> [messages]` for the response body.
fn field_errors(errors: &validator::ValidationErrors) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<String> = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        map.insert(field.to_string(), json!(messages));
    }
    serde_json::Value::Object(map)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg }),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "fields": field_errors(errors) }),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Canceled => (
                StatusCode::REQUEST_TIMEOUT,
                json!({ "error": "request canceled" }),
            ),
            AppError::Serialization(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Invalid payload: {}", e) }),
            ),
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("Internal error: {}", e) }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
