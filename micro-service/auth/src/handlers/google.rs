use super::{required, respond};
use app_authentication::AuthService;
use app_error::{AppError, AppResult};
use async_trait::async_trait;
use axum::{Extension, Json, http::StatusCode, response::Response};
use serde::Deserialize;
use std::sync::Arc;

/// Identity asserted by an external provider after it verified the
/// credential. Only the email participates in account matching.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub email: String,
    pub name: Option<String>,
}

/// Verifier for provider-issued credentials. The service never inspects the
/// credential itself; whoever wires the router decides how Google tokens are
/// checked (or injects a stub in tests).
#[async_trait]
pub trait ExternalIdentity: Send + Sync {
    async fn verify(&self, credential: &str) -> AppResult<ExternalProfile>;
}

/// Default verifier: refuses everything. Deployments without a configured
/// provider keep the endpoint but never accept a credential through it.
pub struct GoogleAuthDisabled;

#[async_trait]
impl ExternalIdentity for GoogleAuthDisabled {
    async fn verify(&self, _credential: &str) -> AppResult<ExternalProfile> {
        Err(AppError::AuthenticationError(
            "Google sign-in is not configured".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSigninRequest {
    pub id_token: Option<String>,
}

pub async fn google_signin(
    Extension(auth): Extension<Arc<AuthService>>,
    Extension(verifier): Extension<Arc<dyn ExternalIdentity>>,
    Json(body): Json<GoogleSigninRequest>,
) -> AppResult<Response> {
    let credential = required(body.id_token, "idToken")?;
    let profile = verifier.verify(&credential).await?;

    let auth_response = auth.external_signin(&profile.email).await?;

    Ok(respond(
        StatusCode::OK,
        "Signed in with Google successfully",
        Some(auth_response),
    ))
}
