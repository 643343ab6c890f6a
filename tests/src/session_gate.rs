use crate::support::{TEST_SECRET, build_app, get, signup, signup_active};
use app_authentication::Claims;
use app_models::user::UserStatus;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

fn token_with(secret: &[u8], user_id: &str, issued_offset: i64, expiry_offset: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        user_id: user_id.to_string(),
        username: "crafted".to_string(),
        iat: (now + Duration::seconds(issued_offset)).timestamp(),
        exp: (now + Duration::seconds(expiry_offset)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .expect("token should encode")
}

#[tokio::test]
async fn protected_route_refuses_anonymous_requests() {
    let app = build_app();

    let (status, body) = get(&app.router, "/api/user/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn malformed_and_missigned_tokens_are_unauthorized() {
    let app = build_app();
    let (user_id, _) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    let (status, body) = get(&app.router, "/api/user/me", Some("not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let missigned = token_with(b"some_other_secret_entirely", &user_id, 0, 3600);
    let (status, body) = get(&app.router, "/api/user/me", Some(&missigned)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn expired_tokens_are_reported_as_expired() {
    let app = build_app();
    let (user_id, _) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    let expired = token_with(TEST_SECRET, &user_id, -7200, -3600);
    let (status, body) = get(&app.router, "/api/user/me", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");
}

#[tokio::test]
async fn a_token_for_a_deleted_account_is_invalid() {
    let app = build_app();
    let (user_id, token) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    app.store.remove(&user_id);

    let (status, body) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn non_active_accounts_are_forbidden() {
    let app = build_app();

    // Freshly registered accounts are pending and do not pass the gate.
    let (user_id, token) = signup(&app.router, "alice", "alice@example.com", "password1").await;
    let (status, body) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is pending. Please contact support.");

    app.store.set_status(&user_id, UserStatus::Suspended);
    let (status, body) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is suspended. Please contact support.");
}

#[tokio::test]
async fn locked_accounts_are_refused_at_the_gate() {
    let app = build_app();
    let (user_id, token) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    app.store
        .set_lock(&user_id, Some(Utc::now() + Duration::hours(2)), 5);

    let (status, body) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(
        body["message"],
        "Account is temporarily locked due to multiple failed login attempts"
    );

    // Once the lock elapses the same token works again.
    app.store
        .set_lock(&user_id, Some(Utc::now() - Duration::seconds(1)), 5);
    let (status, _) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn me_returns_the_profile_for_a_live_session() {
    let app = build_app();
    let (_, token) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    let (status, body) = get(&app.router, "/api/user/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["status"], "active");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn optional_route_personalizes_but_never_refuses() {
    let app = build_app();
    let (_, token) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    let (status, body) = get(&app.router, "/api/overview", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["personalized"], false);

    let (status, body) = get(&app.router, "/api/overview", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["personalized"], true);
    assert_eq!(body["message"], "Welcome back, alice");

    // An invalid token is ignored, not refused.
    let (status, body) = get(&app.router, "/api/overview", Some("garbage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["personalized"], false);
}

#[tokio::test]
async fn admin_routes_check_the_role_after_authentication() {
    let app = build_app();
    let (user_id, token) = signup_active(&app, "alice", "alice@example.com", "password1").await;

    let (status, _) = get(&app.router, "/api/admin/overview", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&app.router, "/api/admin/overview", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "You do not have permission to access this resource"
    );

    app.store.set_role(&user_id, "admin");
    let (status, body) = get(&app.router, "/api/admin/overview", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requestedBy"], "alice");
}

#[tokio::test]
async fn health_check_is_open() {
    let app = build_app();

    let (status, body) = get(&app.router, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "up");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = build_app();

    let request = axum::http::Request::builder()
        .method(axum::http::Method::GET)
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
}
