pub mod macros;
pub mod middleware_handling;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed error type for the whole application. Every failure a request can
/// produce is one of these variants; handlers and middleware dispatch on the
/// variant, never on a type hierarchy.
#[derive(Debug)]
pub enum AppError {
    ConfigError(anyhow::Error),
    DatabaseError(anyhow::Error),
    ServerError(anyhow::Error),
    /// Storage timeout or similar short-lived failure. Safe to retry once.
    TransientError(String),
    ValidationError(String),
    AuthenticationError(String),
    AuthorizationError(String),
    LockedError(String),
    NotFoundError(String),
    ConflictError(String),
    RateLimitError(String),
}

impl AppError {
    // Credential failures collapse to one message so responses never reveal
    // whether the username or the password was wrong.
    pub fn invalid_credentials() -> Self {
        Self::AuthenticationError("Invalid username or password".to_string())
    }

    pub fn token_expired() -> Self {
        Self::AuthenticationError("Token has expired".to_string())
    }

    pub fn token_invalid() -> Self {
        Self::AuthenticationError("Invalid token".to_string())
    }

    pub fn account_locked() -> Self {
        Self::LockedError(
            "Account is temporarily locked due to multiple failed login attempts".to_string(),
        )
    }

    pub fn account_inactive(status: &str) -> Self {
        Self::AuthorizationError(format!("Account is {}. Please contact support.", status))
    }

    pub fn resource_not_found(resource_type: &str) -> Self {
        Self::NotFoundError(format!("{} not found", resource_type))
    }

    pub fn validation(field: &str, message: &str) -> Self {
        Self::ValidationError(format!("Validation failed for '{}': {}", field, message))
    }

    /// Stable machine-readable code for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ServerError(_) => "SERVER_ERROR",
            Self::TransientError(_) => "TRANSIENT_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::AuthenticationError(_) => "AUTHENTICATION_ERROR",
            Self::AuthorizationError(_) => "AUTHORIZATION_ERROR",
            Self::LockedError(_) => "ACCOUNT_LOCKED",
            Self::NotFoundError(_) => "NOT_FOUND",
            Self::ConflictError(_) => "CONFLICT",
            Self::RateLimitError(_) => "RATE_LIMITED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigError(_) | Self::DatabaseError(_) | Self::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TransientError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::AuthorizationError(_) => StatusCode::FORBIDDEN,
            Self::LockedError(_) => StatusCode::LOCKED,
            Self::NotFoundError(_) => StatusCode::NOT_FOUND,
            Self::ConflictError(_) => StatusCode::CONFLICT,
            Self::RateLimitError(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientError(_))
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::ServerError(error)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Self::DatabaseError(e) => write!(f, "Database error: {}", e),
            Self::ServerError(e) => write!(f, "Server error: {}", e),
            Self::TransientError(msg) => write!(f, "Transient error: {}", msg),
            Self::ValidationError(msg)
            | Self::AuthenticationError(msg)
            | Self::AuthorizationError(msg)
            | Self::LockedError(msg)
            | Self::NotFoundError(msg)
            | Self::ConflictError(msg)
            | Self::RateLimitError(msg) => write!(f, "{}", msg),
        }
    }
}

/// JSON error envelope shared by every endpoint. Mirrors the success envelope
/// emitted by the handlers (`success`, `message`, `statusCode`, `timestamp`).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>, status: StatusCode) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
            status_code: status.as_u16(),
            details: None,
            timestamp: Utc::now(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.kind();

        if status.is_server_error() {
            tracing::error!(error_code = code, status_code = %status.as_u16(), "{}", self);
        } else {
            tracing::warn!(error_code = code, status_code = %status.as_u16(), "{}", self);
        }

        // Internal failures keep their detail out of the response body.
        let message = if status.is_server_error() {
            match &self {
                Self::TransientError(_) => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse::new(message, code, status));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Extension trait to wrap foreign errors with a specific variant.
pub trait AppErrorExt<T> {
    fn config_err(self) -> AppResult<T>;
    fn db_err(self) -> AppResult<T>;
    fn server_err(self) -> AppResult<T>;
}

impl<T, E> AppErrorExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn config_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::ConfigError(e.into()))
    }

    fn db_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::DatabaseError(e.into()))
    }

    fn server_err(self) -> AppResult<T> {
        self.map_err(|e| AppError::ServerError(e.into()))
    }
}
