//! Route registry and dispatch.
//!
//! Routes are matched by exact route key, `"<METHOD> <template>"`, in
//! registration order. The host has already resolved the template and the
//! path parameters, so there is no pattern matching here: a lookup is a
//! string comparison per registered route.

use std::sync::Arc;

use http::Method;
use tracing::{Instrument, debug, debug_span, error, warn};

use crate::chain::{IntoChain, Next};
use crate::config::Config;
use crate::event::{Context, Event};
use crate::fault::Fault;
use crate::handler::{BoxedInterceptor, BoxedLink, Interceptor, catch_panics};
use crate::normalize::Normalizer;
use crate::request::Request;
use crate::response::Response;

/// Body message of the 404 returned when nothing matches.
pub const ROUTE_NOT_FOUND: &str = "Route not found";

/// Body message of the 500 returned when a chain ends without a response.
pub const NO_RESPONSE: &str = "No response returned";

struct Route {
    method: Method,
    template: String,
    key: String,
    links: Arc<[BoxedLink]>,
}

/// The process-wide dispatcher.
///
/// Build it once at startup; registration methods take and return `self`,
/// so a router cannot be modified once it is shared with the host.
///
/// ```rust
/// use relay::{Context, Next, Outcome, Request, Response, Router};
///
/// async fn auth(mut req: Request, _ctx: Context, next: Next) -> Outcome {
///     if req.header("authorization").is_none() {
///         return Err("missing credentials".into());
///     }
///     req.extensions_mut().insert(String::from("alice"));
///     next.run(req).await
/// }
///
/// async fn get_agent(req: Request, _ctx: Context, _next: Next) -> Response {
///     let id = req.param("id").unwrap_or("unknown");
///     Response::json(format!(r#"{{"id":"{id}"}}"#))
/// }
///
/// let router = Router::new()
///     .get("/agents/{id}", (auth, get_agent))
///     .fallback(|_req: Request, _ctx: Context, _next: Next| async {
///         Response::builder().status(http::StatusCode::NOT_FOUND).json(r#"{"error":"Not Found"}"#)
///     });
/// ```
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<Arc<[BoxedLink]>>,
    interceptor: Option<BoxedInterceptor>,
    normalizer: Normalizer,
}

impl Router {
    /// A router whose normalizer reads `DEBUG` from the environment now.
    pub fn new() -> Self {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
            interceptor: None,
            normalizer: Normalizer::new(config),
        }
    }

    /// Register a chain for a method + path template pair.
    ///
    /// The template is stored verbatim. Registering the same pair twice is
    /// allowed but pointless: the first registration always wins.
    pub fn on<M>(mut self, method: Method, template: &str, chain: impl IntoChain<M>) -> Self {
        let key = format!("{method} {template}");
        if self.routes.iter().any(|r| r.key == key) {
            warn!(route = %key, "route registered twice; the first registration wins");
        }
        self.routes.push(Route {
            method,
            template: template.to_owned(),
            key,
            links: chain.into_chain().into_links(),
        });
        self
    }

    pub fn get<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::GET, template, chain)
    }

    pub fn post<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::POST, template, chain)
    }

    pub fn put<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::PUT, template, chain)
    }

    pub fn patch<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::PATCH, template, chain)
    }

    pub fn delete<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::DELETE, template, chain)
    }

    pub fn options<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::OPTIONS, template, chain)
    }

    pub fn head<M>(self, template: &str, chain: impl IntoChain<M>) -> Self {
        self.on(Method::HEAD, template, chain)
    }

    /// Chain to run when no route matches. Replaces any previous fallback.
    pub fn fallback<M>(mut self, chain: impl IntoChain<M>) -> Self {
        self.fallback = Some(chain.into_chain().into_links());
        self
    }

    /// Hook that turns any fault raised by a link into a response. Replaces
    /// any previous interceptor.
    pub fn on_error(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptor = Some(interceptor.into_boxed_interceptor());
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Host entry point: reshapes the event and dispatches it.
    pub async fn handle(&self, event: Event, ctx: Context) -> Response {
        self.dispatch(Request::from(event), ctx).await
    }

    /// Routes one request and produces one response. Never fails: every
    /// fault, panic, and missing route ends up as a well-formed [`Response`].
    pub async fn dispatch(&self, req: Request, ctx: Context) -> Response {
        let key = req.route_key();
        let span = debug_span!("dispatch", route = %key);
        self.run(key, req, ctx).instrument(span).await
    }

    async fn run(&self, key: String, mut req: Request, ctx: Context) -> Response {
        let Some(links) = self.resolve(&key) else {
            debug!("no route and no fallback");
            return self.normalizer.message(404, ROUTE_NOT_FOUND);
        };

        req.parse_body();
        let snapshot = self.interceptor.as_ref().map(|_| req.clone());

        match Next::new(Arc::clone(links), ctx.clone()).run(req).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                error!("chain completed without a response");
                self.normalizer.message(500, NO_RESPONSE)
            }
            Err(fault) => self.recover(fault, snapshot, ctx).await,
        }
    }

    fn resolve(&self, key: &str) -> Option<&Arc<[BoxedLink]>> {
        match self.routes.iter().find(|r| r.key == key) {
            Some(route) => {
                debug!("route matched");
                Some(&route.links)
            }
            None => self.fallback.as_ref().inspect(|_| debug!("using fallback chain")),
        }
    }

    async fn recover(&self, fault: Fault, snapshot: Option<Request>, ctx: Context) -> Response {
        warn!(error = %fault, "handler chain failed");
        let (Some(interceptor), Some(req)) = (self.interceptor.as_ref(), snapshot) else {
            return self.normalizer.fault(&fault, 500, &[]);
        };
        match catch_panics(|| interceptor.call(fault, req, ctx)).await {
            Ok(response) => response,
            Err(panic) => {
                let fault = Fault::from_panic(panic);
                error!(error = %fault, "error interceptor panicked");
                self.normalizer.fault(&fault, 500, &[])
            }
        }
    }

    /// Registered `(method, template)` pairs in registration order.
    pub(crate) fn templates(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.template.as_str()))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
