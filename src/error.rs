//! Structured error types and the JSON error envelope.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

/// Broad error category; decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid input. The caller must correct and resubmit.
    Validation,
    /// Referenced entity is absent.
    NotFound,
    /// Delete blocked by existing children.
    Conflict,
    MethodNotAllowed,
    /// Underlying persistence failure.
    Storage,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    EmptyUpdate,
    InvalidRequest,

    // Not found errors
    ProjectNotFound,
    SectionNotFound,
    TaskNotFound,
    LinkNotFound,
    RouteNotFound,

    // Conflict errors
    HasChildren,

    MethodNotAllowed,

    // Internal errors
    DatabaseError,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::EmptyUpdate
            | ErrorCode::InvalidRequest => ErrorKind::Validation,
            ErrorCode::ProjectNotFound
            | ErrorCode::SectionNotFound
            | ErrorCode::TaskNotFound
            | ErrorCode::LinkNotFound
            | ErrorCode::RouteNotFound => ErrorKind::NotFound,
            ErrorCode::HasChildren => ErrorKind::Conflict,
            ErrorCode::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            ErrorCode::DatabaseError => ErrorKind::Storage,
        }
    }
}

/// Structured error returned by every API operation.
///
/// Serializes as the JSON error envelope: `error` is the human readable
/// message, `code` the machine readable one.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(rename = "message", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Required field '{}' is missing", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn empty_update() -> Self {
        Self::new(ErrorCode::EmptyUpdate, "No fields to update")
    }

    pub fn invalid_request(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid request").with_details(err.to_string())
    }

    pub fn project_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project not found: {}", id),
        )
    }

    pub fn section_not_found(id: i64) -> Self {
        Self::new(
            ErrorCode::SectionNotFound,
            format!("Section not found: {}", id),
        )
    }

    pub fn task_not_found(id: i64) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {}", id))
    }

    pub fn link_not_found(id: i64) -> Self {
        Self::new(ErrorCode::LinkNotFound, format!("Link not found: {}", id))
    }

    pub fn has_children(what: &str, children: &str, count: i64) -> Self {
        Self::new(
            ErrorCode::HasChildren,
            format!(
                "Cannot delete {} with {} existing {}; delete them first",
                what, count, children
            ),
        )
    }

    pub fn route_not_found() -> Self {
        Self::new(ErrorCode::RouteNotFound, "Not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed, "Method not allowed")
    }

    /// Storage failures are opaque to callers; the cause is only logged.
    pub fn database(err: impl fmt::Display) -> Self {
        error!(error = %err, "Database error");
        Self::new(ErrorCode::DatabaseError, "Database error")
    }
}

// Allow using ? with anyhow errors from the db layer
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::database(format!("{:#}", err)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind().status();
        if status.is_client_error() {
            warn!(code = ?self.code, error = %self.error, "Request rejected");
        }
        (status, Json(self)).into_response()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
