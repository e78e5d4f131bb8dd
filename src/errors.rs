use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error code reported when an unsafe request carries no CSRF token at all.
pub const CSRF_TOKEN_MISSING: &str = "CSRF_TOKEN_MISSING";
/// Error code reported for every other CSRF validation failure.
pub const CSRF_TOKEN_INVALID: &str = "CSRF_TOKEN_INVALID";

/// Simplified error structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Forbidden",
    "code": "CSRF_TOKEN_INVALID",
    "message": "Invalid CSRF token",
    "details": "DOUBLE_SUBMIT_FAILURE",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request", "Internal Server Error")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Machine-readable error code, when the failure has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "CSRF_TOKEN_MISSING")]
    pub code: Option<String>,
    /// Human-readable error description
    #[schema(example = "Shared material 550e8400-e29b-41d4-a716-446655440000 not found")]
    pub message: String,
    /// Additional error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("CSRF validation failed: {reason}")]
    Csrf { code: &'static str, reason: String },
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<crate::cache::CacheError> for ServiceError {
    fn from(err: crate::cache::CacheError) -> Self {
        ServiceError::CacheError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::Csrf { .. } => StatusCode::FORBIDDEN,
            Self::InternalError(_)
            | Self::CacheError(_)
            | Self::SerializationError(_)
            | Self::MigrationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_)
            | Self::CacheError(_)
            | Self::SerializationError(_)
            | Self::MigrationError(_) => "Internal server error".to_string(),
            Self::Csrf { code, .. } if *code == CSRF_TOKEN_MISSING => {
                "CSRF token missing".to_string()
            }
            Self::Csrf { .. } => "Invalid CSRF token".to_string(),
            _ => self.to_string(),
        }
    }

    /// Machine-readable code carried next to the message, if any.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Csrf { code, .. } => Some(code),
            _ => None,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Csrf { reason, .. } => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn csrf_missing() -> Self {
        Self::Csrf {
            code: CSRF_TOKEN_MISSING,
            reason: "MISSING_TOKEN".to_string(),
        }
    }

    pub fn csrf_invalid(reason: impl Into<String>) -> Self {
        Self::Csrf {
            code: CSRF_TOKEN_INVALID,
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.error_code().map(str::to_string),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
