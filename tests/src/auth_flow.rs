use crate::support::{build_app, build_app_with, permissive_rate_limit, post_json, signup};
use app_models::user::UserStatus;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use micro_auth::handlers::google::GoogleAuthDisabled;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn signup_returns_created_and_strips_the_digest() {
    let app = build_app();

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signup",
        json!({ "username": "Alice", "email": "Alice@Example.com", "password": "password1" }),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 201);
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());

    let user = &body["data"]["user"];
    // Identifiers are stored lower-cased.
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["status"], "pending");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn duplicate_identifiers_conflict_case_insensitively() {
    let app = build_app();
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signup",
        json!({ "username": "other", "email": "ALICE@EXAMPLE.COM", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already in use");
    assert_eq!(body["success"], false);

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signup",
        json!({ "username": "ALICE", "email": "new@example.com", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username is already in use");
}

#[tokio::test]
async fn missing_fields_are_bad_requests() {
    let app = build_app();

    let (status, _) = post_json(
        &app.router,
        "/api/auth/signup",
        json!({ "username": "alice", "email": "alice@example.com" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app.router,
        "/api/auth/signup",
        json!({ "username": "alice", "email": "alice@example.com", "password": "abc" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "short password");
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let app = build_app();
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    let (unknown_status, unknown_body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "nobody", "password": "password1" }),
        None,
    )
    .await;
    let (wrong_status, wrong_body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice", "password": "wrong" }),
        None,
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body["message"], "Invalid username or password");
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn five_failures_lock_the_account_even_for_the_right_password() {
    let app = build_app();
    signup(&app.router, "alice", "alice@example.com", "password1").await;

    for _ in 0..5 {
        let (status, _) = post_json(
            &app.router,
            "/api/auth/signin",
            json!({ "username": "alice", "password": "wrong" }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(
        body["message"],
        "Account is temporarily locked due to multiple failed login attempts"
    );
}

#[tokio::test]
async fn an_elapsed_lock_is_bypassed_and_cleared_on_success() {
    let app = build_app();
    let (user_id, _) = signup(&app.router, "alice", "alice@example.com", "password1").await;

    app.store
        .set_lock(&user_id, Some(Utc::now() - Duration::seconds(1)), 5);

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "elapsed lock must not refuse: {}", body);

    let user = app.store.get(&user_id).unwrap();
    assert_eq!(user.security.failed_attempts, 0);
    assert!(user.security.locked_until.is_none());
}

#[tokio::test]
async fn successful_signin_resets_the_failure_counter() {
    let app = build_app();
    let (user_id, _) = signup(&app.router, "alice", "alice@example.com", "password1").await;

    for _ in 0..3 {
        post_json(
            &app.router,
            "/api/auth/signin",
            json!({ "username": "alice", "password": "wrong" }),
            None,
        )
        .await;
    }
    assert_eq!(app.store.get(&user_id).unwrap().security.failed_attempts, 3);

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user"]["lastLogin"].is_string());
    assert_eq!(app.store.get(&user_id).unwrap().security.failed_attempts, 0);
}

#[tokio::test]
async fn signout_is_idempotent() {
    let app = build_app();
    let (user_id, token) = signup(&app.router, "alice", "alice@example.com", "password1").await;
    assert!(app.store.get(&user_id).unwrap().security.current_token.is_some());

    let (status, _) = post_json(&app.router, "/api/auth/signout", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let user = app.store.get(&user_id).unwrap();
    assert!(user.security.current_token.is_none());
    assert!(user.security.last_logout.is_some());

    // Again with the same token, and with none at all.
    let (status, _) = post_json(&app.router, "/api/auth/signout", json!({}), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app.router, "/api/auth/signout", json!({}), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signout_accepts_a_body_supplied_user_id() {
    let app = build_app();
    let (user_id, _token) = signup(&app.router, "alice", "alice@example.com", "password1").await;
    assert!(app.store.get(&user_id).unwrap().security.current_token.is_some());

    // No bearer at all: the body alone names the account to end.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/signout",
        json!({ "userId": user_id }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user = app.store.get(&user_id).unwrap();
    assert!(user.security.current_token.is_none());
    assert!(user.security.last_logout.is_some());

    // An unknown id still signs out cleanly.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/signout",
        json!({ "userId": "no-such-id" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_token_requires_a_matching_bearer() {
    let app = build_app();
    let (user_id, token) = signup(&app.router, "alice", "alice@example.com", "password1").await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/refresh-token",
        json!({ "userId": user_id }),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["data"]["token"].as_str().unwrap();
    assert!(!new_token.is_empty());

    // Without a bearer.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/refresh-token",
        json!({ "userId": user_id }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // For somebody else's account.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/refresh-token",
        json!({ "userId": "someone-else" }),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Without the target account in the body.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/refresh-token",
        json!({}),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_for_a_deleted_account_is_not_found() {
    let app = build_app();
    let (user_id, token) = signup(&app.router, "alice", "alice@example.com", "password1").await;
    app.store.remove(&user_id);

    let (status, _) = post_json(
        &app.router,
        "/api/auth/refresh-token",
        json!({ "userId": user_id }),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn google_signin_provisions_or_reuses_by_verified_email() {
    let app = build_app();

    let (status, body) = post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "carol@example.com" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user = &body["data"]["user"];
    assert_eq!(user["email"], "carol@example.com");
    assert_eq!(user["status"], "active");
    let first_id = user["id"].as_str().unwrap().to_string();

    // Second sign-in resolves to the same account.
    let (status, body) = post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "carol@example.com" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], first_id.as_str());

    // A refused credential never reaches the account layer.
    let (status, _) = post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "bad" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(&app.router, "/api/auth/google", json!({}), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn google_signin_is_refused_when_no_verifier_is_configured() {
    let app = build_app_with(permissive_rate_limit(), Arc::new(GoogleAuthDisabled));
    let (pre_existing, _) = post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "carol@example.com" }),
        None,
    )
    .await;
    assert_eq!(pre_existing, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "anything" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Google sign-in is not configured");
}

#[tokio::test]
async fn google_accounts_have_no_usable_password() {
    let app = build_app();
    post_json(
        &app.router,
        "/api/auth/google",
        json!({ "idToken": "carol@example.com" }),
        None,
    )
    .await;

    let (status, _) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "carol", "password": "anything" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_response_reflects_the_account_status() {
    let app = build_app();
    let (user_id, _) = signup(&app.router, "alice", "alice@example.com", "password1").await;
    app.store.set_status(&user_id, UserStatus::Active);

    let (status, body) = post_json(
        &app.router,
        "/api/auth/signin",
        json!({ "username": "alice", "password": "password1" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["status"], "active");
}
