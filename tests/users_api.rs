//! End-to-end tests over real TCP against an in-memory user store.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use user_lookup::app;
use user_lookup::database::DatabaseError;
use user_lookup::server::{Server, ServerError};
use user_lookup::users::UserStore;
use user_lookup::User;

struct FixedUsers(HashSet<i32>);

#[async_trait]
impl UserStore for FixedUsers {
    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        Ok(self.0.contains(&id).then_some(User { id }))
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ServerError>>,
}

async fn start(ids: &[i32]) -> Running {
    let store = Arc::new(FixedUsers(ids.iter().copied().collect()));
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();

    let handler = app::router(store).into_handler();
    let task = tokio::spawn(server.run_until(handler, async {
        let _ = stopped.await;
    }));

    Running { addr, stop, task }
}

struct Reply {
    status: u16,
    headers: String,
    body: String,
}

async fn get(addr: SocketAddr, path: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head[9..12].parse().unwrap();
    Reply {
        status,
        headers: head.to_owned(),
        body: body.to_owned(),
    }
}

async fn stop(running: Running) {
    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn non_integer_id_is_rejected() {
    let running = start(&[1]).await;

    for path in ["/users/abc", "/users/1.0", "/users/%31%2E0", "/users/true"] {
        let reply = get(running.addr, path).await;
        assert_eq!(reply.status, 400, "{path}");
        assert_eq!(reply.body, "A valid id must be provided.");
    }

    stop(running).await;
}

#[tokio::test]
async fn percent_encoded_id_is_decoded() {
    let running = start(&[1, 7]).await;

    for (path, id) in [("/users/%31", 1), ("/users/%37", 7)] {
        let reply = get(running.addr, path).await;
        assert_eq!(reply.status, 200, "{path}");
        let user: User = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(user, User { id });
    }

    stop(running).await;
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let running = start(&[7]).await;

    let reply = get(running.addr, "/users/999999").await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "User not found.");

    stop(running).await;
}

#[tokio::test]
async fn known_id_returns_json() {
    let running = start(&[7, 42]).await;

    let reply = get(running.addr, "/users/7").await;
    assert_eq!(reply.status, 200);
    assert!(reply.headers.contains("Content-Type: application/json; charset=utf-8"));
    let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body, serde_json::json!({ "id": 7 }));

    let reply = get(running.addr, "/users/42").await;
    let user: User = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(user, User { id: 42 });

    stop(running).await;
}

#[tokio::test]
async fn repeated_gets_are_identical() {
    let running = start(&[7]).await;

    let first = get(running.addr, "/users/7").await;
    let second = get(running.addr, "/users/7").await;
    assert_eq!(first.status, second.status);
    assert_eq!(first.body, second.body);

    stop(running).await;
}

#[tokio::test]
async fn other_routes_are_not_found() {
    let running = start(&[7]).await;

    assert_eq!(get(running.addr, "/users").await.status, 404);
    assert_eq!(get(running.addr, "/users/7/posts").await.status, 404);
    assert_eq!(get(running.addr, "/").await.status, 404);

    stop(running).await;
}

#[tokio::test]
async fn keep_alive_serves_several_requests() {
    let running = start(&[1, 2]).await;

    let mut stream = TcpStream::connect(running.addr).await.unwrap();
    for id in [1, 2] {
        let req = format!("GET /users/{id} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(req.as_bytes()).await.unwrap();

        let mut buf = [0u8; 512];
        let n = stream.read(&mut buf).await.unwrap();
        let text = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{text}");
        assert!(text.contains("Connection: keep-alive"));
        assert!(text.ends_with(&format!("\"id\": {id}\n}}")));
    }
    drop(stream);

    stop(running).await;
}
