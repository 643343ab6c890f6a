use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

use crate::{AppError, ErrorResponse};

/// Outermost response filter: logs request timing and rewrites raw framework
/// failures (payload too large, unhandled 5xx) into the shared envelope so no
/// internal detail reaches the client.
pub async fn error_handling_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let start = Instant::now();
    let path = req.uri().path().to_owned();
    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed();
    info!(
        "Request completed: {} {} - Status: {} - Time: {:?}",
        method,
        path,
        response.status(),
        latency
    );

    let status = response.status();

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        let error_response = ErrorResponse::new(
            "The request body exceeds the maximum allowed size",
            "PAYLOAD_TOO_LARGE",
            status,
        );

        return Ok(Response::builder()
            .status(StatusCode::PAYLOAD_TOO_LARGE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&error_response).unwrap()))
            .unwrap());
    }

    if status.is_server_error()
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v != "application/json")
            .unwrap_or(true)
    {
        error!("Server error occurred: {}", status);

        let error_response = ErrorResponse::new(
            "An internal server error occurred",
            "SERVER_ERROR",
            StatusCode::INTERNAL_SERVER_ERROR,
        );

        return Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&error_response).unwrap()))
            .unwrap());
    }

    Ok(response)
}
