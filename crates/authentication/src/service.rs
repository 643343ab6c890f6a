use crate::jwt::{Claims, JwtService};
use crate::lockout::LockoutPolicy;
use crate::password::{hash_password, verify_password};
use crate::store::UserStore;
use crate::validation::{sanitize_string, validate_email, validate_password, validate_username};
use app_error::{AppError, AppResult, conflict_error};
use app_models::user::{AuthResponse, SigninInput, SignupInput, User, UserProfile, UserStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_PASSWORD_MIN_LENGTH: usize = 6;

/// Authentication core: signup, signin with lockout, signout, token refresh
/// and delegated identity sign-in. Persistence goes through the `UserStore`
/// trait so the same flows run against SurrealDB or a test double.
pub struct AuthService {
    jwt_service: Arc<JwtService>,
    store: Arc<dyn UserStore>,
    lockout: LockoutPolicy,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(jwt_secret: &[u8], token_expiry_hours: u64, store: Arc<dyn UserStore>) -> Self {
        Self {
            jwt_service: Arc::new(JwtService::new(jwt_secret, token_expiry_hours)),
            store,
            lockout: LockoutPolicy::default(),
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
        }
    }

    pub fn with_lockout(mut self, lockout: LockoutPolicy) -> Self {
        self.lockout = lockout;
        self
    }

    pub fn with_password_min_length(mut self, min_length: usize) -> Self {
        self.password_min_length = min_length;
        self
    }

    pub fn jwt_service(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt_service)
    }

    pub fn store(&self) -> Arc<dyn UserStore> {
        Arc::clone(&self.store)
    }

    /// Register a new account. Usernames and emails are case-insensitive;
    /// both are stored lower-cased. Fails with a conflict when either is
    /// already taken.
    pub async fn signup(&self, input: SignupInput) -> AppResult<AuthResponse> {
        let username = sanitize_string(&input.username).to_lowercase();
        let email = sanitize_string(&input.email).to_lowercase();

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password, self.password_min_length)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return conflict_error!("Email is already in use");
        }

        if self.store.find_by_username(&username).await?.is_some() {
            return conflict_error!("Username is already in use");
        }

        let digest = hash_password(&input.password)?;
        let user = self
            .store
            .create(User::new(username, email, digest))
            .await?;

        let user_id = user.id.id.to_string();
        let token = self.jwt_service.generate_token(&user_id, &user.username)?;
        self.store.store_token(&user_id, &token).await?;

        info!(username = %user.username, "User registered");
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Authenticate with username and password. Unknown usernames and wrong
    /// passwords produce the same error; a locked account is reported before
    /// the password is checked. A lock whose expiry has passed is bypassed and
    /// cleared on the next successful sign-in.
    pub async fn signin(&self, input: SigninInput) -> AppResult<AuthResponse> {
        let username = sanitize_string(&input.username).to_lowercase();
        let now = Utc::now();

        let mut user = match self.store.find_by_username(&username).await? {
            Some(user) => user,
            None => return Err(AppError::invalid_credentials()),
        };
        let user_id = user.id.id.to_string();

        if self.lockout.is_locked(&user.security, now) {
            warn!(username = %user.username, "Sign-in refused for locked account");
            return Err(AppError::account_locked());
        }

        if !verify_password(&input.password, &user.password)? {
            self.store
                .record_failed_attempt(
                    &user_id,
                    self.lockout.max_failed_attempts(),
                    self.lockout.lock_expiry(now),
                )
                .await?;
            return Err(AppError::invalid_credentials());
        }

        let token = self.jwt_service.generate_token(&user_id, &user.username)?;
        self.store
            .record_successful_login(&user_id, &token, now)
            .await?;

        user.security.failed_attempts = 0;
        user.security.locked_until = None;
        user.security.last_login = Some(now);

        info!(username = %user.username, "User signed in");
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Invalidate the mirrored token and stamp the logout time. Signing out
    /// twice, or for an id that no longer exists, still succeeds.
    pub async fn signout(&self, user_id: &str) -> AppResult<()> {
        self.store.record_logout(user_id, Utc::now()).await?;
        info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    /// Re-issue a token for an authenticated caller. The bearer's claims must
    /// name the same account the new token is requested for.
    pub async fn refresh(&self, user_id: &str, claims: &Claims) -> AppResult<String> {
        if claims.user_id != user_id {
            return Err(AppError::AuthorizationError(
                "Cannot refresh a token for another account".to_string(),
            ));
        }

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::resource_not_found("User"))?;

        let token = self.jwt_service.generate_token(user_id, &user.username)?;
        self.store.store_token(user_id, &token).await?;

        info!(username = %user.username, "Token refreshed");
        Ok(token)
    }

    /// Sign in with an identity asserted by an external provider. An existing
    /// account with the asserted email is signed in directly; otherwise an
    /// active account is provisioned with a derived username and an unusable
    /// random password.
    pub async fn external_signin(&self, email: &str) -> AppResult<AuthResponse> {
        let email = sanitize_string(email).to_lowercase();
        validate_email(&email)?;
        let now = Utc::now();

        if let Some(user) = self.store.find_by_email(&email).await? {
            let user_id = user.id.id.to_string();

            if self.lockout.is_locked(&user.security, now) {
                return Err(AppError::account_locked());
            }

            let token = self.jwt_service.generate_token(&user_id, &user.username)?;
            self.store
                .record_successful_login(&user_id, &token, now)
                .await?;

            info!(username = %user.username, "External identity signed in");
            return Ok(AuthResponse {
                token,
                user: UserProfile::from(user),
            });
        }

        let username = self.derive_username(&email).await?;
        // The account is external-only; the stored digest is of a random
        // secret nobody knows, so password sign-in cannot succeed.
        let digest = hash_password(&Uuid::new_v4().to_string())?;

        let mut user = User::new(username, email, digest);
        user.status = UserStatus::Active;

        let user = self.store.create(user).await?;
        let user_id = user.id.id.to_string();

        let token = self.jwt_service.generate_token(&user_id, &user.username)?;
        self.store
            .record_successful_login(&user_id, &token, now)
            .await?;

        info!(username = %user.username, "External identity provisioned");
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Derive a username from the email local part, keeping only characters
    /// the username rules allow and suffixing on collision.
    async fn derive_username(&self, email: &str) -> AppResult<String> {
        let local = email.split('@').next().unwrap_or_default();
        let mut base: String = local
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(24)
            .collect();
        if base.len() < 3 {
            base = format!("user_{}", &Uuid::new_v4().simple().to_string()[..8]);
        }

        if self.store.find_by_username(&base).await?.is_none() {
            return Ok(base);
        }

        let suffix = &Uuid::new_v4().simple().to_string()[..6];
        Ok(format!("{}_{}", base, suffix))
    }
}
