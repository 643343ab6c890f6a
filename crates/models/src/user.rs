use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use uuid::Uuid;

/// Account lifecycle state. Only `Active` accounts pass the session gate;
/// freshly registered accounts start as `Pending` until activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Pending,
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// Security bookkeeping embedded in the user document. The failed-attempt
/// counter and lock timestamp are only ever written through the store's
/// atomic update operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSecurity {
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_logout: Option<DateTime<Utc>>,
    /// Mirror of the most recently issued token; cleared on signout.
    #[serde(default)]
    pub current_token: Option<String>,
}

impl UserSecurity {
    /// A lock in the future refuses authentication; an elapsed lock is
    /// bypassed rather than proactively cleared.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map_or(false, |until| until > now)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(default = "User::generate_id")]
    pub id: Thing,
    pub username: String,
    pub email: String,
    /// Argon2 digest. Never serialized outward; responses use `UserProfile`.
    pub password: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default = "User::default_role")]
    pub role: String,
    #[serde(default)]
    pub security: UserSecurity,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    fn generate_id() -> Thing {
        Thing::from(("users".to_string(), Uuid::new_v4().to_string()))
    }

    fn default_role() -> String {
        "user".to_string()
    }

    /// Create a new user record. `username` and `email` are expected to be
    /// sanitized and lower-cased by the caller; `password` is the digest.
    pub fn new(username: String, email: String, password: String) -> Self {
        let now = Utc::now();
        Self {
            id: Self::generate_id(),
            username,
            email,
            password,
            status: UserStatus::default(),
            role: Self::default_role(),
            security: UserSecurity::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.security.is_locked_at(now)
    }
}

/// Outward-facing view of a user, with the credential digest and security
/// internals stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.id.to_string(),
            username: user.username,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            last_login: user.security.last_login,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
