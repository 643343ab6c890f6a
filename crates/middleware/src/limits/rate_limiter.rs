use app_config::RateLimitSettings;
use app_error::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Per-client counter for the current window. Once `window_reset_at` passes
/// the entry is stale and the next request starts a fresh window.
#[derive(Debug, Clone)]
struct WindowEntry {
    count: usize,
    window_reset_at: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
    /// How often stale entries are swept out of the map.
    pub cleanup_interval: Duration,
    /// Hard bound on tracked clients. When exceeded after a sweep, the
    /// entries closest to reset are evicted first.
    pub max_entries: usize,
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(900), // 15 minutes
            cleanup_interval: Duration::from_secs(300),
            max_entries: 10_000,
            message: "Too many authentication attempts. Please try again later.".into(),
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window: Duration::from_secs(settings.window_secs),
            cleanup_interval: Duration::from_secs(settings.cleanup_interval_secs),
            max_entries: settings.max_entries,
            ..Self::default()
        }
    }
}

/// Fixed-window rate limiter keyed by client identifier. The first request
/// from a client opens a window; requests past the limit are rejected until
/// the window ends, and the window is never slid or extended by traffic.
///
/// Memory is bounded two ways: stale windows are swept on a fixed interval,
/// and the map never tracks more than `max_entries` clients.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    entries: Arc<RwLock<HashMap<String, WindowEntry>>>,
    config: RateLimitConfig,
    last_cleanup: Arc<RwLock<Instant>>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            config,
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(RateLimitConfig::from(settings))
    }

    pub fn max_requests(&self) -> usize {
        self.config.max_requests
    }

    /// Count a request against the client's current window. Rejects with a
    /// rate-limit error once the window's budget is spent.
    pub async fn check(&self, client_id: &str) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        self.cleanup(&mut entries, now).await;

        match entries.get_mut(client_id) {
            Some(entry) if now < entry.window_reset_at => {
                if entry.count >= self.config.max_requests {
                    let seconds_remaining = (entry.window_reset_at - now).as_secs();
                    return Err(AppError::RateLimitError(format!(
                        "{} Try again in {} seconds.",
                        self.config.message, seconds_remaining
                    )));
                }
                entry.count += 1;
            }
            _ => {
                // New client or elapsed window; start fresh.
                entries.insert(
                    client_id.to_string(),
                    WindowEntry {
                        count: 1,
                        window_reset_at: now + self.config.window,
                    },
                );
            }
        }

        Ok(())
    }

    /// Current budget for a client, without consuming any of it.
    pub async fn status(&self, client_id: &str) -> RateLimitStatus {
        let entries = self.entries.read().await;
        let now = Instant::now();

        if let Some(entry) = entries.get(client_id) {
            if now < entry.window_reset_at {
                return RateLimitStatus {
                    limit: self.config.max_requests,
                    remaining: self.config.max_requests.saturating_sub(entry.count),
                    reset_secs: (entry.window_reset_at - now).as_secs(),
                };
            }
        }

        RateLimitStatus {
            limit: self.config.max_requests,
            remaining: self.config.max_requests,
            reset_secs: 0,
        }
    }

    async fn cleanup(&self, entries: &mut HashMap<String, WindowEntry>, now: Instant) {
        let mut last_cleanup = self.last_cleanup.write().await;

        if now.duration_since(*last_cleanup) >= self.config.cleanup_interval {
            entries.retain(|_, entry| now < entry.window_reset_at);
            *last_cleanup = now;
        }

        // The sweep alone does not bound the map; a burst of distinct clients
        // inside one window can still grow it. Evict the windows ending
        // soonest until the bound holds.
        if entries.len() > self.config.max_entries {
            let mut by_reset: Vec<(String, Instant)> = entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.window_reset_at))
                .collect();
            by_reset.sort_by_key(|(_, reset)| *reset);

            let excess = entries.len() - self.config.max_entries;
            for (id, _) in by_reset.into_iter().take(excess) {
                entries.remove(&id);
            }
        }
    }
}

/// Snapshot of a client's budget, surfaced as `X-RateLimit-*` headers.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: usize,
    pub remaining: usize,
    pub reset_secs: u64,
}
