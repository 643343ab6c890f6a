use app_authentication::{Claims, JwtService, UserStore};
use app_error::{AppError, AppResult};
use app_models::user::{User, UserStatus};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Outcome of inspecting a request's credential, before any policy is
/// applied. `require_auth` and `optional_auth` differ only in how they treat
/// the non-authenticated arms.
pub enum AuthAttempt {
    NoCredential,
    Invalid(AppError),
    Authenticated { user: User, claims: Claims },
}

/// Session gate: turns a bearer token into a live account, cross-checking
/// the store so a deleted, deactivated or locked account is refused even
/// while its token is cryptographically valid.
pub struct SessionGate {
    jwt: Arc<JwtService>,
    users: Arc<dyn UserStore>,
}

impl SessionGate {
    pub fn new(jwt: Arc<JwtService>, users: Arc<dyn UserStore>) -> Self {
        Self { jwt, users }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthAttempt {
        let token = match bearer_token(headers) {
            Some(token) => token,
            None => return AuthAttempt::NoCredential,
        };

        match self.resolve(token).await {
            Ok((user, claims)) => AuthAttempt::Authenticated { user, claims },
            Err(err) => AuthAttempt::Invalid(err),
        }
    }

    async fn resolve(&self, token: &str) -> AppResult<(User, Claims)> {
        let claims = self.jwt.validate_token(token)?;

        // A token for a deleted account is indistinguishable from a forged
        // one as far as the caller is concerned.
        let user = self
            .users
            .find_by_id(&claims.user_id)
            .await?
            .ok_or_else(AppError::token_invalid)?;

        if user.status != UserStatus::Active {
            return Err(AppError::account_inactive(user.status.as_str()));
        }

        if user.is_locked_at(Utc::now()) {
            return Err(AppError::account_locked());
        }

        Ok((user, claims))
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Refuse the request unless it carries a valid session for a live account.
/// The resolved `User` and `Claims` are inserted as extensions for handlers
/// downstream.
pub async fn require_auth(
    State(gate): State<Arc<SessionGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match gate.authenticate(req.headers()).await {
        AuthAttempt::Authenticated { user, claims } => {
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        AuthAttempt::Invalid(err) => Err(err),
        AuthAttempt::NoCredential => Err(AppError::AuthenticationError(
            "Authentication required".to_string(),
        )),
    }
}

/// Attach the session when a valid one is presented, and otherwise let the
/// request through anonymously. An invalid token is logged and ignored
/// rather than refused.
pub async fn optional_auth(
    State(gate): State<Arc<SessionGate>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match gate.authenticate(req.headers()).await {
        AuthAttempt::Authenticated { user, claims } => {
            req.extensions_mut().insert(user);
            req.extensions_mut().insert(claims);
        }
        AuthAttempt::Invalid(err) => {
            debug!("Ignoring invalid credential on optional route: {}", err);
        }
        AuthAttempt::NoCredential => {}
    }

    Ok(next.run(req).await)
}

/// Role allow-list for a route group. Cheap to clone into middleware state.
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<Vec<String>>);

impl AllowedRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(roles.into_iter().map(Into::into).collect()))
    }

    pub fn allows(&self, role: &str) -> bool {
        self.0.iter().any(|allowed| allowed == role)
    }
}

/// Refuse authenticated callers whose role is not on the allow-list. Must
/// run after `require_auth`, which provides the `User` extension.
pub async fn require_role(
    State(roles): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req.extensions().get::<User>().ok_or_else(|| {
        AppError::AuthenticationError("Authentication required".to_string())
    })?;

    if !roles.allows(&user.role) {
        return Err(AppError::AuthorizationError(
            "You do not have permission to access this resource".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
