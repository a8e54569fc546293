//! Request routing — map URL patterns and HTTP methods to handler functions.
//!
//! | Pattern              | Example match              | Captured params                  |
//! |----------------------|----------------------------|----------------------------------|
//! | `/health`            | `/health`                  | *(none)*                         |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                      |
//! | `/files/*`           | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"`  |
//!
//! Captured parameters are percent-decoded, so `/users/%34%32` also yields
//! `id → "42"`. A wildcard only matches at a segment boundary: `/files/*`
//! covers `/files` and `/files/...` but not `/filesystem`.
//!
//! Trailing slashes are normalized on both patterns and incoming paths. Routes
//! are matched in registration order and the first match wins. Every dispatch,
//! including the `404 Not Found` fallback, runs through the middleware stack.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::context::{Context, PathParams};
use crate::middleware::{Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async route handler.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Blanket-implemented for every `Fn(Context) -> impl Future<Output = Response>`
/// that is `Send + Sync + 'static`.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Parameterized { segments: Vec<Segment> },
    Wildcard(String),
}

fn trim_trailing_slash(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

impl Pattern {
    /// Compiles a route pattern: `/*` suffix → wildcard, any `:` → parameterized,
    /// otherwise exact.
    fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Pattern::Wildcard(prefix.to_string());
        }

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_string()),
                    None => Segment::Static(s.to_string()),
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => {
                            // Invalid UTF-8 decodes lossily and fails whatever parsing follows.
                            let value = percent_decode_str(path_seg).decode_utf8_lossy();
                            params.insert(name.clone(), value.into_owned());
                        }
                    }
                }
                Some(params)
            }
            Pattern::Wildcard(prefix) => path
                .strip_prefix(prefix.as_str())
                .filter(|suffix| suffix.is_empty() || suffix.starts_with('/'))
                .map(|suffix| {
                    let mut params = PathParams::new();
                    params.insert("wildcard".to_string(), suffix.to_string());
                    params
                }),
        }
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if &self.method == method {
            self.pattern.matches(path)
        } else {
            None
        }
    }
}

/// HTTP request router.
///
/// # Examples
///
/// ```rust,no_run
/// use user_lookup::{context::Context, Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/users/:id", |ctx: Context| async move {
///     let id = ctx.params().get("id").unwrap_or_default().to_owned();
///     Response::text(StatusCode::Ok, id)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<MiddlewareHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    /// Registers a handler for `method` requests matching `path`.
    pub fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(path),
            handler,
        });
    }

    /// Wraps every dispatch in `middleware`. Layers run in the order added,
    /// outermost first.
    pub fn layer<M>(&mut self, middleware: Arc<M>)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(middleware));
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches `request` through the middleware stack to the first matching
    /// route, or to the `404 Not Found` fallback.
    pub async fn route(&self, request: Request) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            route
                .matches(request.method(), request.path())
                .map(|params| (Arc::clone(&route.handler), params))
        });

        let (endpoint, ctx) = match matched {
            Some((handler, params)) => (handler, Context::with_params(request, params)),
            None => (not_found(), Context::new(request)),
        };

        let mut chain = self.middlewares.clone();
        chain.push(Arc::new(move |ctx: Context, _next: Next| endpoint(ctx)));
        Next::new(chain).run(ctx).await
    }

    /// Turns the router into a request handler suitable for
    /// [`Server::run`](crate::server::Server::run).
    pub fn into_handler(
        self,
    ) -> impl Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static
    {
        let router = Arc::new(self);
        move |request| {
            let router = Arc::clone(&router);
            Box::pin(async move { router.route(request).await })
                as Pin<Box<dyn Future<Output = Response> + Send>>
        }
    }
}

fn not_found() -> Handler {
    Arc::new(|_ctx: Context| {
        Box::pin(async { Response::new(StatusCode::NotFound) })
            as Pin<Box<dyn Future<Output = Response> + Send>>
    })
}
