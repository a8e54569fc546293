//! The `GET /users/:id` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::context::Context;
use crate::database::DatabaseError;
use crate::router::Router;
use crate::{Response, StatusCode};

pub const INVALID_ID_MESSAGE: &str = "A valid id must be provided.";
pub const NOT_FOUND_MESSAGE: &str = "User not found.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// A row of the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
}

/// Source of user records.
///
/// [`Database`](crate::database::Database) is the production implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user with the given id, or `None` when no row matches.
    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError>;
}

/// Registers `GET /users/:id` on `router`, answering from `store`.
pub fn routes(router: &mut Router, store: Arc<dyn UserStore>) {
    router.get("/users/:id", move |ctx: Context| {
        let store = Arc::clone(&store);
        async move { get_user(store.as_ref(), &ctx).await }
    });
}

/// Looks up the user named by the `id` path parameter.
///
/// - non-integer id → `400`, no lookup
/// - no such user → `404`
/// - store failure → `500`
pub async fn get_user(store: &dyn UserStore, ctx: &Context) -> Response {
    let Some(id) = ctx.params().get("id").and_then(parse_id) else {
        return Response::text(StatusCode::BadRequest, INVALID_ID_MESSAGE);
    };

    match store.find_user(id).await {
        Ok(Some(user)) => Response::json(StatusCode::Ok, &user).unwrap_or_else(|e| {
            error!(user_id = id, error = %e, "failed to serialize user");
            Response::text(StatusCode::InternalServerError, INTERNAL_ERROR_MESSAGE)
        }),
        Ok(None) => {
            debug!(user_id = id, "user not found");
            Response::text(StatusCode::NotFound, NOT_FOUND_MESSAGE)
        }
        Err(e) => {
            error!(user_id = id, error = %e, "user lookup failed");
            Response::text(StatusCode::InternalServerError, INTERNAL_ERROR_MESSAGE)
        }
    }
}

/// Parses a decimal `i32` literal with an optional sign. Anything else,
/// including out-of-range values and surrounding whitespace, is rejected.
fn parse_id(raw: &str) -> Option<i32> {
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        ids: HashSet<i32>,
        lookups: AtomicUsize,
    }

    impl MemoryStore {
        fn with(ids: &[i32]) -> Self {
            Self {
                ids: ids.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.contains(&id).then_some(User { id }))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn find_user(&self, _id: i32) -> Result<Option<User>, DatabaseError> {
            Err(DatabaseError::Query(sqlx::Error::PoolClosed))
        }
    }

    async fn get(store: Arc<dyn UserStore>, path: &str) -> Response {
        let mut router = Router::new();
        routes(&mut router, store);
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        router.route(req).await
    }

    fn body(resp: &Response) -> &str {
        std::str::from_utf8(resp.payload()).unwrap()
    }

    #[test]
    fn parse_id_accepts_signed_integers_only() {
        assert_eq!(parse_id("7"), Some(7));
        assert_eq!(parse_id("-3"), Some(-3));
        assert_eq!(parse_id("+12"), Some(12));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("1.5"), None);
        assert_eq!(parse_id(" 1"), None);
        assert_eq!(parse_id("2147483648"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn user_serializes_as_id_object() {
        let json = serde_json::to_value(User { id: 42 }).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 42 }));
    }

    #[tokio::test]
    async fn invalid_id_is_400_without_lookup() {
        let store = Arc::new(MemoryStore::with(&[1]));
        for path in ["/users/abc", "/users/1e3", "/users/0x10", "/users/99999999999"] {
            let resp = get(store.clone(), path).await;
            assert_eq!(resp.status(), StatusCode::BadRequest, "{path}");
            assert_eq!(body(&resp), INVALID_ID_MESSAGE);
        }
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_user_is_404() {
        let resp = get(Arc::new(MemoryStore::with(&[7])), "/users/999999").await;
        assert_eq!(resp.status(), StatusCode::NotFound);
        assert_eq!(body(&resp), NOT_FOUND_MESSAGE);
        assert_eq!(resp.headers().get("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn existing_user_is_200_json() {
        let resp = get(Arc::new(MemoryStore::with(&[42])), "/users/42").await;
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(
            resp.headers().get("content-type"),
            Some("application/json; charset=utf-8")
        );
        let user: User = serde_json::from_slice(resp.payload()).unwrap();
        assert_eq!(user, User { id: 42 });
    }

    #[tokio::test]
    async fn repeated_lookups_are_identical() {
        let store: Arc<dyn UserStore> = Arc::new(MemoryStore::with(&[7]));
        let first = get(store.clone(), "/users/7").await;
        let second = get(store, "/users/7").await;
        assert_eq!(first.status(), second.status());
        assert_eq!(first.payload(), second.payload());
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let resp = get(Arc::new(BrokenStore), "/users/7").await;
        assert_eq!(resp.status(), StatusCode::InternalServerError);
        assert_eq!(body(&resp), INTERNAL_ERROR_MESSAGE);
    }
}
