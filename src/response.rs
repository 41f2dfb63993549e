//! Standard response envelope helpers. Success and error bodies share the
//! `success` discriminator so clients can branch without reading the status line.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Pagination metadata attached to list responses.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

pub fn ok(message: String, data: Option<Value>) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message,
            data,
        }),
    )
}

pub fn created(message: String, data: Value) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            message,
            data: Some(data),
        }),
    )
}

/// Error body: human-readable message, machine-readable code, and the numeric
/// status duplicated for clients that skip the status line.
pub fn error_envelope(message: &str, error: Value, error_code: &str, status_code: u16) -> Value {
    json!({
        "success": false,
        "message": message,
        "error": error,
        "errorCode": error_code,
        "statusCode": status_code
    })
}
