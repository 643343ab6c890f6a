use crate::support::{build_app_with_limit, send, signup};
use app_middleware::RateLimitConfig;
use axum::http::{Method, StatusCode};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

fn tight_limit(max_requests: usize, window: Duration) -> RateLimitConfig {
    RateLimitConfig {
        max_requests,
        window,
        cleanup_interval: Duration::from_secs(0),
        max_entries: 100,
        message: "Too many authentication attempts. Please try again later.".into(),
    }
}

async fn signin_as(
    router: &axum::Router,
    client: &str,
    username: &str,
    password: &str,
) -> (StatusCode, serde_json::Value) {
    send(
        router,
        Method::POST,
        "/api/auth/signin",
        Some(json!({ "username": username, "password": password })),
        None,
        Some(client),
    )
    .await
}

#[tokio::test]
async fn requests_past_the_budget_are_refused() {
    let app = build_app_with_limit(tight_limit(3, Duration::from_secs(900)));
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    // Failed sign-ins burn budget like any other sign-in.
    for _ in 0..3 {
        let (status, _) = signin_as(&app.router, "203.0.113.9", "alice", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = signin_as(&app.router, "203.0.113.9", "alice", "password1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Too many authentication attempts")
    );
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn budgets_are_tracked_per_client() {
    let app = build_app_with_limit(tight_limit(2, Duration::from_secs(900)));
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    for _ in 0..2 {
        signin_as(&app.router, "203.0.113.9", "alice", "wrong").await;
    }
    let (status, _) = signin_as(&app.router, "203.0.113.9", "alice", "wrong").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different client is unaffected.
    let (status, _) = signin_as(&app.router, "198.51.100.7", "alice", "password1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn the_window_resets_on_schedule() {
    let app = build_app_with_limit(tight_limit(1, Duration::from_secs(1)));
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    let (status, _) = signin_as(&app.router, "203.0.113.9", "alice", "password1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = signin_as(&app.router, "203.0.113.9", "alice", "password1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, _) = signin_as(&app.router, "203.0.113.9", "alice", "password1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_headers_report_the_budget() {
    let app = build_app_with_limit(tight_limit(3, Duration::from_secs(900)));
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signin")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(axum::body::Body::from(
            json!({ "username": "alice", "password": "password1" }).to_string(),
        ))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "3");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "2");
    assert!(headers.contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn only_signin_burns_budget() {
    let app = build_app_with_limit(tight_limit(1, Duration::from_secs(900)));

    // Several signups from the same client go through untouched.
    for i in 0..4 {
        let (status, _) = send(
            &app.router,
            Method::POST,
            "/api/auth/signup",
            Some(json!({
                "username": format!("user{}", i),
                "email": format!("user{}@example.com", i),
                "password": "password1"
            })),
            None,
            Some("203.0.113.9"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // The single budgeted request is still available for sign-in.
    let (status, _) = signin_as(&app.router, "203.0.113.9", "user0", "password1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = signin_as(&app.router, "203.0.113.9", "user0", "password1").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
