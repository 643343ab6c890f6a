use super::{required, respond};
use app_authentication::AuthService;
use app_error::{AppResult, auth_error};
use app_middleware::session::bearer_token;
use app_models::user::{SigninInput, SignupInput, TokenResponse};
use axum::{
    Extension, Json,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoutRequest {
    pub user_id: Option<String>,
}

pub async fn signup(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Response> {
    let input = SignupInput {
        username: required(body.username, "username")?,
        email: required(body.email, "email")?,
        password: required(body.password, "password")?,
    };

    let auth_response = auth.signup(input).await?;

    Ok(respond(
        StatusCode::CREATED,
        "User registered successfully",
        Some(auth_response),
    ))
}

pub async fn signin(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(body): Json<SigninRequest>,
) -> AppResult<Response> {
    let input = SigninInput {
        username: required(body.username, "username")?,
        password: required(body.password, "password")?,
    };

    let auth_response = auth.signin(input).await?;

    Ok(respond(
        StatusCode::OK,
        "Signed in successfully",
        Some(auth_response),
    ))
}

/// Signing out never fails: the body names the account to end, falling back
/// to the bearer claims, and ending an already-ended session changes nothing.
pub async fn signout(
    Extension(auth): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<SignoutRequest>,
) -> AppResult<Response> {
    let user_id = body
        .user_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            bearer_token(&headers).and_then(|token| {
                match auth.jwt_service().validate_token(token) {
                    Ok(claims) => Some(claims.user_id),
                    Err(err) => {
                        debug!("Signout with an unusable token: {}", err);
                        None
                    }
                }
            })
        });

    if let Some(user_id) = user_id {
        auth.signout(&user_id).await?;
    }

    Ok(respond(
        StatusCode::OK,
        "Signed out successfully",
        None::<()>,
    ))
}

/// Re-issue a token. The caller must present a currently valid token for the
/// same account the body names.
pub async fn refresh_token(
    Extension(auth): Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Response> {
    let bearer = match bearer_token(&headers) {
        Some(token) => token,
        None => return auth_error!("Authentication required"),
    };
    let claims = auth.jwt_service().validate_token(bearer)?;

    let user_id = required(body.user_id, "userId")?;
    let token = auth.refresh(&user_id, &claims).await?;

    Ok(respond(
        StatusCode::OK,
        "Token refreshed successfully",
        Some(TokenResponse { token }),
    ))
}
