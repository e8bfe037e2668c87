//! Error handling for the Quill server API
//!
//! This module contains standardized error handling for the API.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::error::ServerError;

/// Convert a server error into a standardized API error response.
///
/// `request` optionally echoes the (redacted) originating request into the
/// diagnostic body, so a failed publish can be replayed from logs alone.
pub fn api_error_response(err: &ServerError, request: Option<Value>) -> axum::response::Response {
    let (status, error_code, message) = match err {
        ServerError::NotFound(resource) => (
            StatusCode::NOT_FOUND,
            "ERR_NOT_FOUND",
            format!("{} not found", resource),
        ),
        ServerError::ValidationError(msg) => {
            (StatusCode::BAD_REQUEST, "ERR_VALIDATION_ERROR", msg.clone())
        }
        ServerError::Unauthorized(msg) => {
            (StatusCode::UNAUTHORIZED, "ERR_UNAUTHORIZED", msg.clone())
        }
        ServerError::ContentError(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_CONTENT_STORE_ERROR",
            format!("{}", err),
        ),
        ServerError::ConfigError(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_CONFIG_ERROR",
            msg.clone(),
        ),
        ServerError::InternalError(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ERR_INTERNAL_SERVER_ERROR",
            msg.clone(),
        ),
    };

    let mut body = json!({
        "error": message,
        "errorDetails": {
            "errorCode": error_code,
            "errorMessage": message,
            "details": {
                "debug": format!("{:?}", err)
            }
        }
    });
    if let Some(request) = request {
        body["request"] = request;
    }

    (status, Json(body)).into_response()
}
