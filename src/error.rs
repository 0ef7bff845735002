//! Structured error types for API responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Error categories mapped to HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input (400).
    Validation,
    /// Missing or invalid credentials (401).
    Unauthorized,
    /// Entity absent, or present but not owned by the caller (404).
    NotFound,
    /// Uniqueness clash, e.g. registering an email twice (409).
    Conflict,
    /// Operation refused by a domain rule, e.g. deleting a non-empty stage (400).
    Constraint,
    /// Unexpected failure; logged server-side, masked in the response (500).
    Internal,
}

/// Structured error rendered as the failure envelope
/// `{"success": false, "error": {"message", "details"?}}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    /// Field-level messages, present only for validation failures.
    pub details: Option<BTreeMap<String, String>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    // Convenience constructors

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Validation failure with per-field messages.
    pub fn invalid_fields(details: BTreeMap<String, String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Absence and non-ownership produce the same error so that probing
    /// another user's ids reveals nothing.
    pub fn not_found(entity: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{} not found", entity))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Constraint, message)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Internal, err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Constraint => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Allow using ? with anyhow errors from the db layer by converting them.
// Domain errors raised deep in a transaction round-trip through anyhow
// and come back out typed; everything else is masked as internal.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(err),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.kind == ErrorKind::Internal {
            error!(error = %self.message, "internal error");
            "Internal server error".to_string()
        } else {
            self.message
        };

        let mut error = json!({ "message": message });
        if let Some(details) = self.details {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Collects per-field validation messages and converts to a single error.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ok when no field failed, otherwise a validation error carrying the map.
    pub fn into_result(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::invalid_fields(self.errors))
        }
    }
}
