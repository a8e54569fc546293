//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler
//! function. Connections are persistent (keep-alive) unless the client asks
//! otherwise. [`Server::run_until`] adds a graceful shutdown: stop accepting,
//! let in-flight requests finish, close idle connections, then return.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use user_lookup::server::Server;
/// use user_lookup::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server
///         .run_until(
///             |_req: Request| async { Response::text(StatusCode::Ok, "up") },
///             async { let _ = tokio::signal::ctrl_c().await; },
///         )
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until the process is terminated.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// Once it does, the listener is closed, every open connection is told to
    /// close after its in-flight request, and this method waits for all
    /// connection tasks to finish before returning.
    ///
    /// # Errors
    ///
    /// Currently infallible after a successful bind; accept errors are logged
    /// and the loop continues.
    pub async fn run_until<H, F, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        let (closing_tx, closing_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        info!(address = %self.local_addr, "listening");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };

                    debug!(peer = %peer_addr, "connection accepted");
                    let handler = Arc::clone(&handler);
                    let closing = closing_rx.clone();

                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, peer_addr, handler, closing).await {
                            warn!(peer = %peer_addr, error = %e, "connection closed with error");
                        }
                    });
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!(error = %e, "connection task failed");
                    }
                }
            }
        }

        drop(self.listener);
        closing_tx.send_replace(true);

        let open = connections.len();
        if open > 0 {
            info!(connections = open, "draining open connections");
        }
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "connection task failed");
            }
        }

        info!("server stopped");
        Ok(())
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// Loops one request per iteration until the peer closes, the request asks
/// for `Connection: close`, or the server starts shutting down.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    mut closing: watch::Receiver<bool>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);
    // Pipelined requests may already sit in `buf`; only read when it cannot
    // yield a complete request.
    let mut need_read = true;

    loop {
        if *closing.borrow() {
            debug!(peer = %peer_addr, "closing connection for shutdown");
            break;
        }

        if need_read {
            let bytes_read = tokio::select! {
                read = stream.read_buf(&mut buf) => read?,
                _ = closing.changed() => {
                    debug!(peer = %peer_addr, "closing idle connection for shutdown");
                    break;
                }
            };

            if bytes_read == 0 {
                debug!(peer = %peer_addr, "connection closed by peer");
                break;
            }
        }
        need_read = true;

        // Guard against excessively large requests.
        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            write_too_large(&mut stream).await?;
            break;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            // Headers not yet fully received.
            Err(RequestError::Incomplete) => continue,
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::text(StatusCode::BadRequest, format!("Bad Request: {e}"))
                    .keep_alive(false);
                stream.write_all(&response.into_bytes()).await?;
                break;
            }
        };

        // A declared body we would never buffer is rejected before waiting for it.
        let content_length = request.content_length().unwrap_or(0);
        let total_needed = match body_offset.checked_add(content_length) {
            Some(total) if total <= MAX_REQUEST_SIZE => total,
            _ => {
                warn!(peer = %peer_addr, content_length, "declared body too large, sending 413");
                write_too_large(&mut stream).await?;
                break;
            }
        };

        // Wait for the full body to arrive.
        if buf.len() < total_needed {
            continue;
        }

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let keep_alive = request.is_keep_alive();
        let response = handler(request).await;
        // Once shutdown starts, finish this request and tell the client we are done.
        let keep_alive = keep_alive && !*closing.borrow();

        stream
            .write_all(&response.keep_alive(keep_alive).into_bytes())
            .await?;
        stream.flush().await?;

        // Drop the consumed request; whatever remains is the next pipelined one.
        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "closing connection after response");
            break;
        }
        need_read = buf.is_empty();
    }

    Ok(())
}

async fn write_too_large(stream: &mut TcpStream) -> Result<(), std::io::Error> {
    let response =
        Response::text(StatusCode::PayloadTooLarge, "Request entity too large").keep_alive(false);
    stream.write_all(&response.into_bytes()).await
}
