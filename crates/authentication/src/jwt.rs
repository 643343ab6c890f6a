use app_error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by a session token. Validity is determined purely by the
/// signature and `exp`; the session gate separately cross-checks that the
/// account is still active and unlocked.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: u64,
}

impl JwtService {
    pub fn new(secret: &[u8], expiry_hours: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry_hours,
        }
    }

    pub fn generate_token(&self, user_id: &str, username: &str) -> AppResult<String> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.expiry_hours as i64);

        let claims = Claims {
            user_id: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::ServerError(anyhow::anyhow!("Failed to generate token: {}", e)))
    }

    /// Verify a token, distinguishing an expired token from a malformed or
    /// wrongly signed one. Both map to 401 but keep distinct messages.
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AppError::token_expired(),
                    _ => {
                        debug!("Token validation failed: {}", e);
                        AppError::token_invalid()
                    }
                }
            })?;

        debug!("Token validated for user: {}", token_data.claims.username);
        Ok(token_data.claims)
    }
}
