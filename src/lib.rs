//! # user-lookup
//!
//! An async HTTP/1.1 service that answers `GET /users/{id}` from a PostgreSQL
//! `users` table.
//!
//! ```text
//! GET /users/7     → 200 {"id": 7}
//! GET /users/abc   → 400 A valid id must be provided.
//! GET /users/99999 → 404 User not found.
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use user_lookup::app::App;
//! use user_lookup::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let app = App::bind(&config).await?;
//!     app.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

// ── Service ───────────────────────────────────────────────────────────────────
pub mod app;
pub mod config;
pub mod database;
pub mod users;

// ── HTTP plumbing ─────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
pub use users::User;
