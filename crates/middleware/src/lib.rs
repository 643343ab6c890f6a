pub mod api_middleware;
pub mod limits;
pub mod session;

pub use api_middleware::{
    auth_rate_limit_middleware, extract_client_id, security_headers_middleware,
};
pub use limits::{FixedWindowLimiter, RateLimitConfig, RateLimitStatus};
pub use session::{AllowedRoles, SessionGate, require_auth, optional_auth, require_role};
