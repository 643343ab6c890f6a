//! SurrealDB access layer: a health-checked connection pool and thin
//! statement builders sized to what the stores actually run.

pub mod db_connect;
pub mod service;

use std::sync::Arc;
use tokio::sync::OnceCell;

pub use service::{Database, DbCredentials, PooledConnection, QueryBuilder, QueryResponse};

/// Process-wide database handle, initialized once at startup.
pub static DB_ARC: OnceCell<Arc<Database>> = OnceCell::const_new();
