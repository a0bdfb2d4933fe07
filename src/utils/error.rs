//! Error types and handling
//!
//! This module provides the error taxonomy for the gateway. All errors are
//! converted to a consistent JSON response format, carrying a machine-readable
//! code and, for denials that should clear the client session, a
//! `requiresLogout` hint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// No token, or a token too garbled to hand to the identity provider (401)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Token rejected by the identity provider (401)
    #[error("Invalid token")]
    InvalidToken,

    /// Identity provider unreachable or failing (503), kept distinct from
    /// InvalidToken so clients do not log users out on transient outages
    #[error("Identity provider unavailable: {0}")]
    AuthServiceUnavailable(String),

    /// Authenticated, but no business-user record exists (403)
    #[error("User account not found")]
    UserNotFound,

    /// Authenticated, but the business-user record is deactivated (403)
    #[error("User account is deactivated")]
    UserDeactivated,

    /// Authenticated and active, but no profile assigned (403)
    #[error("No profile assigned")]
    NoProfileAssigned,

    /// Authenticated but failing the route's profile/permission requirement (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Too many requests in the current window (429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// A pending invite already exists for the email (409)
    #[error("Conflict: {0}")]
    InviteConflict(String),

    /// Invite validation/consumption failure, deliberately generic (400)
    #[error("Invalid or expired invitation")]
    InviteInvalid,

    /// Studio service unreachable (502)
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable code for programmatic handling by the console UI
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::AuthServiceUnavailable(_) => "AUTH_SERVICE_UNAVAILABLE",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::UserDeactivated => "USER_DEACTIVATED",
            AppError::NoProfileAssigned => "NO_PROFILE_ASSIGNED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::InviteConflict(_) => "INVITE_CONFLICT",
            AppError::InviteInvalid => "INVITE_INVALID",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client should clear its session and re-authenticate.
    ///
    /// True only for denials that cannot be resolved by retrying with the
    /// same token: the token is bad, or the account behind it is gone.
    pub fn requires_logout(&self) -> bool {
        matches!(
            self,
            AppError::InvalidToken | AppError::UserNotFound | AppError::UserDeactivated
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::AuthServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UserNotFound
            | AppError::UserDeactivated
            | AppError::NoProfileAssigned
            | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::InviteConflict(_) => StatusCode::CONFLICT,
            AppError::InviteInvalid | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable code (e.g. USER_DEACTIVATED)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Hint that the client should clear its session and re-authenticate
    #[serde(rename = "requiresLogout", skip_serializing_if = "std::ops::Not::not")]
    pub requires_logout: bool,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: None,
            details: None,
            requires_logout: false,
        }
    }

    /// Add a machine-readable code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add details to the error response
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let should_log = status.is_server_error() || matches!(self, AppError::Forbidden(_));

        if should_log {
            error!(error = %self, code = self.code(), "Request error");
        }

        let error_type = match status {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            StatusCode::CONFLICT => "conflict",
            StatusCode::BAD_GATEWAY => "bad_gateway",
            StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::UNPROCESSABLE_ENTITY => "validation_error",
            _ => "internal_error",
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            code: Some(self.code().to_string()),
            details: None,
            requires_logout: self.requires_logout(),
        };

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.message().contains("UNIQUE constraint failed") {
                    AppError::InviteConflict("Resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
