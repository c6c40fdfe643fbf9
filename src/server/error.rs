// Error handling utilities and response helpers

use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;

/// Helper to create a coded JSON error response
///
/// Body shape: `{"error": {"code": ..., "message": ...}}`. The code lets
/// callers tell "no data yet" apart from "system malfunction".
pub fn json_error(status: StatusCode, code: &str, message: &str) -> impl IntoResponse + use<> {
    (
        status,
        axum::Json(json!({"error": {"code": code, "message": message}})),
    )
}

/// 404 for a queried range holding no records
pub fn no_data(message: &str) -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "no_data", message)
}

/// 422 for a structurally valid request with unusable content
pub fn unprocessable(code: &str, message: &str) -> impl IntoResponse {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, code, message)
}

/// 500 for internal failures
pub fn internal_error(message: &str) -> impl IntoResponse {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// 503 for conditions worth redelivering or retrying against
pub fn unavailable(code: &str, message: &str) -> impl IntoResponse {
    json_error(StatusCode::SERVICE_UNAVAILABLE, code, message)
}

/// Helper for task join errors
pub fn task_join_error(e: impl std::fmt::Display) -> impl IntoResponse {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        &format!("task join error: {}", e),
    )
}
