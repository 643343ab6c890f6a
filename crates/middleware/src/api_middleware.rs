use crate::limits::FixedWindowLimiter;
use app_error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Identify the client for rate limiting. Proxy headers win over the socket
/// address so limits hold behind a load balancer; an unidentifiable client
/// shares one bucket rather than bypassing the limiter.
pub fn extract_client_id(req: &Request) -> String {
    if let Some(ip) = forwarded_client_ip(req.headers()) {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            // The first entry is the originating client.
            if let Some(client) = value.split(',').next() {
                let client = client.trim();
                if !client.is_empty() {
                    return Some(client.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Enforce the authentication rate limit and report the remaining budget
/// through `X-RateLimit-*` headers on both allowed and refused responses.
pub async fn auth_rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_id = extract_client_id(&req);

    let outcome = limiter.check(&client_id).await;
    let status = limiter.status(&client_id).await;

    let mut response = match outcome {
        Ok(()) => next.run(req).await,
        Err(err) => {
            warn!(client = %client_id, "Authentication rate limit exceeded");
            axum::response::IntoResponse::into_response(err)
        }
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", header_number(status.limit as u64));
    headers.insert(
        "x-ratelimit-remaining",
        header_number(status.remaining as u64),
    );
    headers.insert("x-ratelimit-reset", header_number(status.reset_secs));

    Ok(response)
}

fn header_number(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Baseline response hardening headers applied to every route.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-xss-protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
