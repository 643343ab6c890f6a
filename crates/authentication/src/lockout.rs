use app_models::user::UserSecurity;
use chrono::{DateTime, Duration, Utc};

/// Brute-force lockout policy: a fixed threshold of failed attempts locks the
/// account for a fixed duration. The lock never ends early and is never
/// extended retroactively; once `locked_until` passes, the next attempt is
/// evaluated as if the account were open.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        // 5 failed attempts lock the account for 2 hours.
        Self::new(5, 2 * 60 * 60)
    }
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, lock_duration_secs: u64) -> Self {
        Self {
            max_failed_attempts,
            lock_duration: Duration::seconds(lock_duration_secs as i64),
        }
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    /// The lock expiry to apply if the attempt being recorded reaches the
    /// threshold.
    pub fn lock_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.lock_duration
    }

    pub fn is_locked(&self, security: &UserSecurity, now: DateTime<Utc>) -> bool {
        security.is_locked_at(now)
    }

    /// Seconds until an active lock expires; 0 when not locked.
    pub fn remaining_secs(&self, security: &UserSecurity, now: DateTime<Utc>) -> u64 {
        security
            .locked_until
            .filter(|until| *until > now)
            .map(|until| (until - now).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}
