//! Database layer — the PostgreSQL connection pool and the user lookup query.
//!
//! [`Database`] owns a lazily-connecting [`PgPool`]: building it only validates
//! the connection URL, and physical connections are opened on first use. The
//! handle is cheap to clone and every clone shares the same pool.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Row};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::users::{User, UserStore};

const FIND_USER_SQL: &str = "SELECT * FROM users WHERE id = $1";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("invalid database URL: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("failed to acquire a database connection: {0}")]
    Acquire(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// Handle to the shared PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Builds the pool described by `config`.
    ///
    /// No connection is attempted here; a malformed URL is the only failure.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidUrl`] if `config.url` cannot be parsed.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = PgConnectOptions::from_str(&config.url).map_err(DatabaseError::InvalidUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options);

        info!(
            max_connections = config.max_connections,
            acquire_timeout = ?config.acquire_timeout,
            "database pool created"
        );
        Ok(Self { pool })
    }

    /// Waits for a connection from the pool, opening one if needed.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DatabaseError> {
        self.pool.acquire().await.map_err(DatabaseError::Acquire)
    }

    /// Closes the pool, waiting for checked-out connections to come back.
    ///
    /// Consumes this handle; other clones observe the pool as closed.
    pub async fn close(self) {
        info!("Shutting down DB connection pool...");
        self.pool.close().await;
        info!("DB connection pool successfully shutdown");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl UserStore for Database {
    #[instrument(skip(self))]
    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let mut conn = self.acquire().await?;

        let row = sqlx::query(FIND_USER_SQL)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DatabaseError::Query)?;

        row.map(|row| row.try_get::<i32, _>("id").map(|id| User { id }))
            .transpose()
            .map_err(DatabaseError::Query)
    }
}
