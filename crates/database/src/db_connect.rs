use app_config::AppConfig;
use app_error::AppError;
use std::sync::Arc;

use crate::{Database, service::DbCredentials};

/// Connect to the configured SurrealDB instance; the `memory` endpoint skips
/// root authentication and is intended for development and tests.
pub async fn initialize_db(config: &AppConfig) -> Result<Arc<Database>, AppError> {
    let db_config = &config.database;

    tracing::debug!("Connecting to SurrealDB: {}", db_config.endpoint);

    if db_config.endpoint.starts_with("wss://") {
        tracing::info!("Using secure TLS connection to database");
    } else if !db_config.endpoint.contains("memory") {
        tracing::warn!("Using non-secure database connection");
    }

    let max_connections = db_config.pool.size;

    tracing::info!(
        "Initializing database connection pool with {} connections",
        max_connections
    );

    if db_config.endpoint.contains("memory") {
        return initialize_memory_db(max_connections, &db_config.namespace, &db_config.database)
            .await;
    }

    let credentials = DbCredentials::new(&db_config.username, &db_config.password);

    let db = Database::initialize(
        &db_config.endpoint,
        max_connections,
        &db_config.namespace,
        &db_config.database,
        &credentials,
    )
    .await?;

    tracing::info!("Successfully connected to SurrealDB with connection pool");

    Ok(Arc::new(db))
}

pub async fn initialize_memory_db(
    max_connections: usize,
    namespace: &str,
    database: &str,
) -> Result<Arc<Database>, AppError> {
    let db = Database::initialize_memory_db(max_connections, namespace, database).await?;

    tracing::info!("Successfully connected to in-memory SurrealDB");

    Ok(Arc::new(db))
}
