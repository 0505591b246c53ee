//! API route handlers, one module per resource.

pub mod auth;
pub mod blog;
pub mod categories;
pub mod dashboard;
pub mod faq;
pub mod health;
pub mod leads;
pub mod media;
pub mod settings;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

/// Error body shared by every handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Success body for mutations that return no record
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub(crate) fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: None,
        }),
    )
        .into_response()
}

/// 400 - input failed a shape/constraint check; `error` names the field.
pub(crate) fn bad_request(error: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, error)
}

/// 400 with an explanatory message alongside the field name
pub(crate) fn bad_request_detail(error: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }),
    )
        .into_response()
}

pub(crate) fn unauthorized(error: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, error)
}

pub(crate) fn forbidden(error: &str) -> Response {
    error_response(StatusCode::FORBIDDEN, error)
}

pub(crate) fn conflict(error: &str) -> Response {
    error_response(StatusCode::CONFLICT, error)
}

/// 500 - store or internal failure. Details are logged server-side by the
/// caller; the client only sees a generic message.
pub(crate) fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// True when the error is a Postgres unique-constraint violation (SQLSTATE
/// 23505), i.e. a duplicate slug/email/key on insert.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes_without_empty_message() {
        let body = ErrorResponse {
            error: "Title is required".to_string(),
            message: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Title is required"}"#);
    }
}
