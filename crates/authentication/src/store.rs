use app_database::Database;
use app_error::{AppError, AppResult};
use app_models::user::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// Credential store adapter. The core depends on these operations and nothing
/// else about persistence; not-found is an empty result, never an error.
///
/// `record_failed_attempt` must be atomic at the store: the counter increment
/// and the conditional lock are one conditional update, so concurrent failed
/// attempts against the same account cannot lose increments.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: User) -> AppResult<User>;

    /// Atomically increment the failed-attempt counter and, if the new count
    /// reaches `max_failed_attempts`, set `locked_until = lock_until`.
    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Reset the lockout state, mirror the newly issued token and stamp
    /// `last_login`, in one update.
    async fn record_successful_login(
        &self,
        id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Clear the token mirror and stamp `last_logout`. A no-op for unknown
    /// ids, which keeps signout idempotent.
    async fn record_logout(&self, id: &str, now: DateTime<Utc>) -> AppResult<()>;

    /// Mirror a re-issued token without touching the lockout state.
    async fn store_token(&self, id: &str, token: &str) -> AppResult<()>;
}

/// Transient storage failures are safe to retry exactly once; everything else
/// propagates immediately.
macro_rules! retry_once {
    ($op:expr) => {
        match $op {
            Err(err) if err.is_transient() => {
                warn!("Transient storage error, retrying once: {}", err);
                $op
            }
            other => other,
        }
    };
}

/// SurrealDB-backed credential store.
pub struct SurrealUserStore {
    db: Arc<Database>,
    table: String,
}

impl SurrealUserStore {
    pub fn new(db: Arc<Database>, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
        }
    }

    async fn find_one_by_field(&self, field: &str, value: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT * FROM {} WHERE {} = $value", self.table, field);
        let response = self
            .db
            .query(sql)
            .bind(("value", value.to_string()))
            .r#await()
            .await?;

        let mut users: Vec<User> = response.take(0).await?;
        Ok(users.pop())
    }

    async fn run_find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.db.select((&self.table, id)).await
    }

    async fn run_create(&self, user: User) -> AppResult<User> {
        let stored: Option<User> = self
            .db
            .create(&self.table)
            .content(user)
            .await?;

        stored.ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Database did not return the created user"))
        })
    }

    async fn run_record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<()> {
        // One statement: SET clauses evaluate left to right, so the lock
        // condition sees the already-incremented counter.
        let sql = "UPDATE type::thing($tb, $id) SET \
             security.failed_attempts += 1, \
             security.locked_until = IF security.failed_attempts >= $max \
                 THEN $until ELSE security.locked_until END, \
             updated_at = $now";

        self.db
            .query(sql)
            .bind(("tb", self.table.clone()))
            .bind(("id", id.to_string()))
            .bind(("max", max_failed_attempts as i64))
            .bind(("until", serde_json::to_value(lock_until).unwrap_or_default()))
            .bind(("now", serde_json::to_value(Utc::now()).unwrap_or_default()))
            .r#await()
            .await?;

        Ok(())
    }

    async fn run_record_successful_login(
        &self,
        id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let sql = "UPDATE type::thing($tb, $id) SET \
             security.failed_attempts = 0, \
             security.locked_until = NONE, \
             security.current_token = $token, \
             security.last_login = $now, \
             updated_at = $now";

        self.db
            .query(sql)
            .bind(("tb", self.table.clone()))
            .bind(("id", id.to_string()))
            .bind(("token", token.to_string()))
            .bind(("now", serde_json::to_value(now).unwrap_or_default()))
            .r#await()
            .await?;

        Ok(())
    }

    async fn run_record_logout(&self, id: &str, now: DateTime<Utc>) -> AppResult<()> {
        let sql = "UPDATE type::thing($tb, $id) SET \
             security.current_token = NONE, \
             security.last_logout = $now, \
             updated_at = $now";

        self.db
            .query(sql)
            .bind(("tb", self.table.clone()))
            .bind(("id", id.to_string()))
            .bind(("now", serde_json::to_value(now).unwrap_or_default()))
            .r#await()
            .await?;

        Ok(())
    }

    async fn run_store_token(&self, id: &str, token: &str) -> AppResult<()> {
        let sql = "UPDATE type::thing($tb, $id) SET \
             security.current_token = $token, \
             updated_at = $now";

        self.db
            .query(sql)
            .bind(("tb", self.table.clone()))
            .bind(("id", id.to_string()))
            .bind(("token", token.to_string()))
            .bind(("now", serde_json::to_value(Utc::now()).unwrap_or_default()))
            .r#await()
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SurrealUserStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        retry_once!(self.find_one_by_field("username", username).await)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        retry_once!(self.find_one_by_field("email", email).await)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        retry_once!(self.run_find_by_id(id).await)
    }

    async fn create(&self, user: User) -> AppResult<User> {
        retry_once!(self.run_create(user.clone()).await)
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<()> {
        retry_once!(
            self.run_record_failed_attempt(id, max_failed_attempts, lock_until)
                .await
        )
    }

    async fn record_successful_login(
        &self,
        id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        retry_once!(self.run_record_successful_login(id, token, now).await)
    }

    async fn record_logout(&self, id: &str, now: DateTime<Utc>) -> AppResult<()> {
        retry_once!(self.run_record_logout(id, now).await)
    }

    async fn store_token(&self, id: &str, token: &str) -> AppResult<()> {
        retry_once!(self.run_store_token(id, token).await)
    }
}
