//! Typed errors and their single mapping to HTTP status + response envelope.

use crate::response::error_envelope;
use crate::store::StoreError;
use crate::validate::FieldViolation;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

/// Catalog construction failures; surface at startup, never per-request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate resource path: {0}")]
    DuplicatePath(String),
    #[error("duplicate domain-id prefix '{prefix}' ({paths})")]
    DuplicatePrefix { prefix: String, paths: String },
    #[error("domain key listed in public fields for resource {0}")]
    DomainKeyInPublicFields(String),
    #[error("pad width must be non-zero for resource {0}")]
    ZeroPadWidth(String),
}

/// Per-request error taxonomy. Every handler returns `Result<_, ApiError>`;
/// the `IntoResponse` impl is the centralized rendering boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldViolation>),
    #[error("{entity} not found with {key}: {value}")]
    NotFound {
        entity: String,
        key: String,
        value: String,
    },
    #[error("duplicate value for {field}: '{value}'")]
    Conflict { field: String, value: String },
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("internal error")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    pub fn not_found(entity: &str, key: &str, value: &str) -> Self {
        ApiError::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn single_violation(field: &str, value: Option<Value>, message: String) -> Self {
        ApiError::Validation(vec![FieldViolation {
            field: field.to_string(),
            rejected_value: value,
            message,
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Auth(_) => "UNAUTHORIZED",
            ApiError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }
}

/// Storage failures are reclassified, never passed through raw: a malformed
/// id or schema violation becomes a 400, a unique-index hit a 409, and only
/// genuine backend faults reach 500.
impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidId { field, value } => ApiError::single_violation(
                &field,
                Some(Value::String(value.clone())),
                format!("{} is not a valid id: '{}'", field, value),
            ),
            StoreError::Schema { field, message } => {
                ApiError::single_violation(&field, None, message)
            }
            StoreError::DuplicateKey { field, value } => ApiError::Conflict { field, value },
            StoreError::Backend(source) => ApiError::Unexpected(source),
        }
    }
}

impl From<Vec<FieldViolation>> for ApiError {
    fn from(v: Vec<FieldViolation>) -> Self {
        ApiError::Validation(v)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();
        let (message, error) = match &self {
            ApiError::Validation(violations) => (
                "Validation failed".to_string(),
                Value::Array(
                    violations
                        .iter()
                        .map(|v| Value::String(v.message.clone()))
                        .collect(),
                ),
            ),
            ApiError::Unexpected(source) => {
                // Log the cause; the client only sees the envelope.
                tracing::error!(error = %source, "unexpected error");
                (
                    "Internal server error".to_string(),
                    Value::String("Internal server error".to_string()),
                )
            }
            other => {
                let msg = other.to_string();
                (msg.clone(), Value::String(msg))
            }
        };
        let body = error_envelope(&message, error, code, status.as_u16());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_reclassified() {
        let e: ApiError = StoreError::InvalidId {
            field: "supplier_Id".into(),
            value: "zz".into(),
        }
        .into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.error_code(), "VALIDATION_ERROR");

        let e: ApiError = StoreError::Schema {
            field: "name".into(),
            message: "name is required".into(),
        }
        .into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let e: ApiError = StoreError::DuplicateKey {
            field: "contact.email".into(),
            value: "a@x.com".into(),
        }
        .into();
        assert_eq!(e.status(), StatusCode::CONFLICT);
        assert_eq!(e.error_code(), "CONFLICT");

        let e: ApiError = StoreError::Backend("boom".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn not_found_names_entity_and_key() {
        let e = ApiError::not_found("Supplier", "supplierID", "SP-00001");
        assert_eq!(e.to_string(), "Supplier not found with supplierID: SP-00001");
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
    }
}
