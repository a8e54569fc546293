//! Process lifecycle: pool, routes, listener, and the ordered shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::database::{Database, DatabaseError};
use crate::middleware::LoggerMiddleware;
use crate::router::Router;
use crate::server::{Server, ServerError};
use crate::users;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Builds the service router: access logging plus the user routes.
pub fn router(store: Arc<dyn users::UserStore>) -> Router {
    let mut router = Router::new();
    router.layer(Arc::new(LoggerMiddleware));
    users::routes(&mut router, store);
    router
}

/// A bound, not-yet-serving instance of the service.
pub struct App {
    server: Server,
    database: Database,
}

impl App {
    /// Creates the pool and binds the listener.
    ///
    /// # Errors
    ///
    /// Fails on a malformed database URL or when the address cannot be bound.
    /// The pool is closed before a bind error is returned.
    pub async fn bind(config: &Config) -> Result<Self, AppError> {
        let database = Database::connect(&config.database)?;

        let server = match Server::bind(&config.bind_addr).await {
            Ok(server) => server,
            Err(e) => {
                database.close().await;
                return Err(e.into());
            }
        };

        Ok(Self { server, database })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Returns a handle sharing this instance's pool.
    pub fn database(&self) -> Database {
        self.database.clone()
    }

    /// Serves until `shutdown` resolves, then closes the pool.
    ///
    /// The pool is closed exactly once, after the server has stopped accepting
    /// and every connection has finished.
    pub async fn run<S>(self, shutdown: S) -> Result<(), AppError>
    where
        S: Future<Output = ()>,
    {
        let Self { server, database } = self;
        let handler = router(Arc::new(database.clone())).into_handler();

        let served = server.run_until(handler, shutdown).await;
        database.close().await;
        info!("shutdown complete");

        served.map_err(AppError::from)
    }
}
