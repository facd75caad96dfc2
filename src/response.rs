use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// One failed input check, in the `{msg, path}` shape the clients expect.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub msg: &'static str,
    pub path: &'static str,
}

/// Handler error rendered as `{"error": ...}`, or `{"errors": [...]}` when
/// it carries field-level validation failures.
#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    message: String,
    fields: Vec<FieldError>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// 400 carrying every failed check as an `errors` array.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: String::from("Validation failed"),
            fields,
        }
    }

    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            fields: Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = if self.fields.is_empty() {
            json!({ "error": self.message })
        } else {
            json!({ "errors": self.fields })
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(status: StatusCode, msg: impl Into<String>) -> AppError {
    AppError::with_status(status, msg)
}
