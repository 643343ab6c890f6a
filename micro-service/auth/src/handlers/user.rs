use super::respond;
use app_models::user::{User, UserProfile};
use axum::{Extension, extract::Request, http::StatusCode, response::Response};
use serde_json::json;

pub async fn me(Extension(user): Extension<User>) -> Response {
    respond(
        StatusCode::OK,
        "Profile fetched successfully",
        Some(UserProfile::from(user)),
    )
}

/// Works with or without a session; the gate attaches a `User` extension
/// only when a valid one was presented.
pub async fn overview(req: Request) -> Response {
    match req.extensions().get::<User>() {
        Some(user) => respond(
            StatusCode::OK,
            format!("Welcome back, {}", user.username),
            Some(json!({ "personalized": true })),
        ),
        None => respond(
            StatusCode::OK,
            "Welcome",
            Some(json!({ "personalized": false })),
        ),
    }
}

pub async fn admin_overview(Extension(user): Extension<User>) -> Response {
    respond(
        StatusCode::OK,
        "Admin overview",
        Some(json!({ "requestedBy": user.username })),
    )
}
