pub mod auth;
pub mod google;
pub mod user;

use app_error::{AppResult, validation_error};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Success envelope shared by every endpoint, mirroring the error envelope
/// emitted by `AppError`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: status.is_success(),
            message: message.into(),
            data,
            status_code: status.as_u16(),
            timestamp: Utc::now(),
        }
    }
}

pub fn respond<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: Option<T>,
) -> Response {
    (status, Json(ApiResponse::new(status, message, data))).into_response()
}

/// Missing or blank body fields are a 400, not a deserialization failure.
pub(crate) fn required(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => validation_error!(field, "value is required"),
    }
}

pub async fn health_check() -> Response {
    respond(
        StatusCode::OK,
        "Service is healthy",
        Some(serde_json::json!({ "service": "auth", "status": "up" })),
    )
}
