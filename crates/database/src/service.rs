use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    marker::PhantomData,
    sync::{Arc, Mutex},
    time::Duration,
};
use surrealdb::{engine::any::Any, opt::auth::Root};
use tokio::time::timeout;

use app_error::{AppError, AppErrorExt, AppResult};

/// Pool of reusable connections. Connections are health-checked before reuse
/// and handed out wrapped in [`PooledConnection`], which returns them on drop.
pub(crate) struct ConnectionPool {
    connection_url: String,
    connections: Arc<Mutex<Vec<surrealdb::Surreal<Any>>>>,
    max_size: usize,
}

impl ConnectionPool {
    fn new(connection_url: &str, max_size: usize) -> Self {
        Self {
            connection_url: connection_url.to_string(),
            connections: Mutex::new(Vec::with_capacity(max_size)).into(),
            max_size,
        }
    }

    /// Pop a pooled connection or dial a fresh one. The health check and the
    /// connect attempt carry bounded timeouts; a timeout surfaces as a
    /// transient error the caller may retry.
    async fn get_connection(&self) -> AppResult<PooledConnection<'_>> {
        let conn_opt: Option<surrealdb::Surreal<Any>> = {
            let mut connections = self.connections.lock().map_err(|e| {
                AppError::ServerError(anyhow::anyhow!(
                    "Failed to lock connection pool mutex: {}",
                    e
                ))
            })?;
            connections.pop()
        };

        if let Some(conn) = conn_opt {
            match timeout(Duration::from_secs(2), conn.health()).await {
                Ok(Ok(_)) => {
                    return Ok(PooledConnection::new(conn, self));
                }
                _ => {
                    // Stale connection; let it drop and dial a fresh one.
                    tracing::debug!("Discarding invalid connection from pool");
                }
            }
        }

        let conn_future = surrealdb::engine::any::connect(&self.connection_url);
        match timeout(Duration::from_secs(5), conn_future).await {
            Ok(conn_result) => {
                let new_conn = conn_result
                    .context("Failed to connect to database")
                    .db_err()?;

                Ok(PooledConnection::new(new_conn, self))
            }
            Err(_) => Err(AppError::TransientError(
                "Database connection timeout - could not establish connection within 5 seconds"
                    .to_string(),
            )),
        }
    }

    fn return_connection(&self, conn: surrealdb::Surreal<Any>) {
        if let Ok(mut connections) = self.connections.lock() {
            if connections.len() < self.max_size {
                connections.push(conn);
            }
        }
        // A full pool or a poisoned mutex just drops the connection.
    }
}

/// A borrowed connection that goes back to the pool when dropped.
pub struct PooledConnection<'a> {
    conn: Option<surrealdb::Surreal<Any>>,
    pool: &'a ConnectionPool,
}

impl<'a> PooledConnection<'a> {
    fn new(conn: surrealdb::Surreal<Any>, pool: &'a ConnectionPool) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    pub fn get_ref(&self) -> &surrealdb::Surreal<Any> {
        // Only emptied by Drop.
        self.conn.as_ref().unwrap()
    }
}

impl<'a> Drop for PooledConnection<'a> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn);
        }
    }
}

#[derive(Clone)]
pub struct DbCredentials {
    username: String,
    password: String,
}

impl DbCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_password(&self) -> &str {
        &self.password
    }
}

// Don't accidentally log credentials
impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn new(connection_url: &str, max_connections: usize) -> Self {
        if !connection_url.starts_with("ws://")
            && !connection_url.starts_with("wss://")
            && !connection_url.starts_with("memory")
        {
            tracing::warn!(
                "Potentially invalid database connection URL format: {}",
                connection_url
            );
        }

        Self {
            pool: ConnectionPool::new(connection_url, max_connections),
        }
    }

    pub async fn get_connection(&self) -> AppResult<PooledConnection<'_>> {
        self.pool.get_connection().await
    }

    pub async fn initialize(
        connection_url: &str,
        max_connections: usize,
        namespace: &str,
        database: &str,
        credentials: &DbCredentials,
    ) -> AppResult<Self> {
        if namespace.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Database namespace cannot be empty".into(),
            ));
        }

        if database.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Database name cannot be empty".into(),
            ));
        }

        let db = Self::new(connection_url, max_connections);

        {
            let conn = db.get_connection().await?;

            conn.get_ref()
                .signin(Root {
                    username: credentials.get_username(),
                    password: credentials.get_password(),
                })
                .await
                .context("Failed to authenticate with database")
                .db_err()?;

            conn.get_ref()
                .use_ns(namespace)
                .use_db(database)
                .await
                .context("Failed to select namespace and database")
                .db_err()?;
        }

        Ok(db)
    }

    pub async fn initialize_memory_db(
        max_connections: usize,
        namespace: &str,
        database: &str,
    ) -> AppResult<Self> {
        let db = Self::new("memory", max_connections);

        {
            let conn = db.get_connection().await?;

            conn.get_ref()
                .use_ns(namespace)
                .use_db(database)
                .await
                .context("Failed to select namespace and database")
                .db_err()?;
        }

        Ok(db)
    }

    pub fn create<T>(&self, table: &str) -> CreateBuilder<'_, T> {
        CreateBuilder {
            pool: &self.pool,
            table: table.to_string(),
            _phantom: PhantomData,
        }
    }

    pub async fn select<T>(&self, location: (&str, &str)) -> AppResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let conn = self.get_connection().await?;
        conn.get_ref()
            .select((location.0, location.1))
            .await
            .context("Failed to select record")
            .db_err()
    }

    pub fn query(&self, sql: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder {
            pool: &self.pool,
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }
}

pub struct CreateBuilder<'a, T> {
    pool: &'a ConnectionPool,
    table: String,
    _phantom: PhantomData<T>,
}

impl<'a, T> CreateBuilder<'a, T>
where
    T: Serialize + Send + Sync + 'static,
{
    pub async fn content(self, data: T) -> AppResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let conn = self.pool.get_connection().await?;
        conn.get_ref()
            .create(&self.table)
            .content(data)
            .await
            .context("Failed to create record")
            .db_err()
    }
}

pub struct QueryBuilder<'a> {
    pool: &'a ConnectionPool,
    sql: String,
    bindings: Vec<(String, serde_json::Value)>,
}

impl<'a> QueryBuilder<'a> {
    pub fn bind(mut self, binding: (impl Into<String>, impl Into<serde_json::Value>)) -> Self {
        self.bindings.push((binding.0.into(), binding.1.into()));
        self
    }

    pub async fn r#await(self) -> AppResult<QueryResponse> {
        let conn = self.pool.get_connection().await?;
        let mut query = conn.get_ref().query(&self.sql);

        for (name, value) in self.bindings {
            query = query.bind((name, value));
        }

        let response = query.await.context("Failed to execute query").db_err()?;
        Ok(QueryResponse(response))
    }
}

pub struct QueryResponse(surrealdb::Response);

impl QueryResponse {
    pub async fn take<T>(mut self, index: usize) -> AppResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.0
            .take(index)
            .map_err(|e| anyhow::anyhow!("Failed to extract query results: {}", e))
            .context("Failed to extract query results")
            .db_err()
    }
}
