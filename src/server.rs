//! Local gateway emulator.
//!
//! In production the host resolves the route template, extracts path
//! parameters, and invokes the function with an event. [`Server`] plays that
//! role over plain HTTP so a router can be exercised with `curl` during
//! development:
//!
//! 1. Every template registered on the router is compiled into a radix tree
//!    (one per method), with `{name+}` greedy segments mapped to catch-alls.
//! 2. Each HTTP request is matched against the tree. A hit becomes the
//!    request's template and path parameters; a miss keeps the raw path as
//!    template, which sends it to the fallback chain (or the 404).
//! 3. The request is dispatched and the [`Response`] written back.
//!
//! Shutdown is graceful: on SIGTERM or Ctrl-C the server stops accepting
//! connections, drains the in-flight ones, and returns.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::{Method, StatusCode};
use http_body_util::{BodyExt as _, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use matchit::Router as MatchitRouter;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::event::Context;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Function name reported in the emulator's [`Context`].
pub const LOCAL_FUNCTION: &str = "local";

/// The local HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use relay::Server;
    /// let server = Server::bind("127.0.0.1:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { addr: addr.to_owned() }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|source| Error::Addr {
            addr: self.addr.clone(),
            source,
        })?;
        let listener = TcpListener::bind(addr).await?;
        let gateway = Arc::new(Gateway::new(router));

        info!(%addr, "relay gateway emulator listening");

        let mut tasks = tokio::task::JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even under load.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let gateway = Arc::clone(&gateway);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let gateway = Arc::clone(&gateway);
                            async move { gateway.emulate(req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("relay gateway emulator stopped");
        Ok(())
    }
}

// ── Template resolution ───────────────────────────────────────────────────────

/// The router plus one radix tree per method mapping paths to templates.
struct Gateway {
    router: Router,
    trees: HashMap<Method, MatchitRouter<String>>,
}

impl Gateway {
    fn new(router: Router) -> Self {
        let mut trees: HashMap<Method, MatchitRouter<String>> = HashMap::new();
        for (method, template) in router.templates() {
            if !template.starts_with('/') {
                continue;
            }
            let pattern = matchit_pattern(template);
            if let Err(e) = trees
                .entry(method.clone())
                .or_default()
                .insert(pattern, template.to_owned())
            {
                warn!(%method, template, "template not reachable in the emulator: {e}");
            }
        }
        Self { router, trees }
    }

    /// Resolved template and path parameters for a request path.
    fn resolve(&self, method: &Method, path: &str) -> Option<(String, HashMap<String, String>)> {
        let matched = self.trees.get(method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value.clone(), params))
    }

    async fn emulate(
        &self,
        req: hyper::Request<hyper::body::Incoming>,
    ) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("failed to read request body: {e}");
                Bytes::new()
            }
        };

        let path = parts.uri.path().to_owned();
        let (template, params) = self
            .resolve(&parts.method, &path)
            .unwrap_or_else(|| (path.clone(), HashMap::new()));

        let mut builder = Request::builder()
            .method(parts.method)
            .path(&path)
            .template(&template);
        for (name, value) in &params {
            builder = builder.param(name, value);
        }
        if let Some(query) = parts.uri.query() {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                builder = builder.query(&name, &value);
            }
        }
        for (name, value) in &parts.headers {
            if let Ok(value) = value.to_str() {
                builder = builder.header(name.as_str(), value);
            }
        }
        if !body.is_empty() {
            builder = match String::from_utf8(body.to_vec()) {
                Ok(text) => builder.body(text),
                Err(_) => builder.body(STANDARD.encode(&body)).base64_encoded(true),
            };
        }

        let ctx = Context {
            request_id: Uuid::new_v4().to_string(),
            function_name: LOCAL_FUNCTION.to_owned(),
            ..Context::default()
        };
        let response = self.router.dispatch(builder.build(), ctx).await;
        Ok(into_http(response))
    }
}

/// `/files/{path+}` → `/files/{*path}`; everything else passes through.
fn matchit_pattern(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix("+}")) {
            Some(name) => format!("{{*{name}}}"),
            None => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn into_http(response: Response) -> http::Response<Full<Bytes>> {
    let mut builder = http::Response::builder().status(response.status_code);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    builder.body(Full::new(Bytes::from(response.body))).unwrap_or_else(|e| {
        error!("invalid response from handler chain: {e}");
        let mut fallback = http::Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or Ctrl-C. A handler that cannot be installed is
/// logged and treated as never firing.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Next;
    use crate::config::Config;

    async fn ok(_req: Request, _ctx: Context, _next: Next) -> Response {
        Response::text("ok")
    }

    #[test]
    fn greedy_segments_become_catch_alls() {
        assert_eq!(matchit_pattern("/files/{path+}"), "/files/{*path}");
        assert_eq!(matchit_pattern("/agents/{id}/settings"), "/agents/{id}/settings");
    }

    #[test]
    fn resolves_templates_and_params() {
        let router = Router::with_config(Config::default())
            .get("/agents/{id}/settings/{settingId}", ok)
            .get("/files/{path+}", ok)
            .post("/agents", ok);
        let gateway = Gateway::new(router);

        let (template, params) = gateway.resolve(&Method::GET, "/agents/42/settings/99").unwrap();
        assert_eq!(template, "/agents/{id}/settings/{settingId}");
        assert_eq!(params["id"], "42");
        assert_eq!(params["settingId"], "99");

        let (template, params) = gateway.resolve(&Method::GET, "/files/a/b.txt").unwrap();
        assert_eq!(template, "/files/{path+}");
        assert_eq!(params["path"], "a/b.txt");

        assert!(gateway.resolve(&Method::GET, "/agents").is_none());
        assert!(gateway.resolve(&Method::DELETE, "/agents").is_none());
    }

    #[test]
    fn converts_to_http_response() {
        let res = into_http(Response::builder().status(StatusCode::CREATED).header("X-A", "1").text("hi"));
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["X-A"], "1");
    }

    #[tokio::test]
    async fn invalid_address_is_an_error() {
        let err = Server::bind("not an address")
            .serve(Router::with_config(Config::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Addr { .. }));
    }
}
