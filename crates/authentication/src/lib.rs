pub mod jwt;
pub mod lockout;
pub mod password;
pub mod service;
pub mod store;
pub mod validation;

// Re-export key items for convenience
pub use jwt::{Claims, JwtService};
pub use lockout::LockoutPolicy;
pub use password::{hash_password, verify_password};
pub use service::AuthService;
pub use store::{SurrealUserStore, UserStore};
