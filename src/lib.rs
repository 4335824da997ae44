//! # relay
//!
//! A request dispatcher for single-entry-point serverless HTTP functions.
//! One router receives every invocation, finds the chain registered for it,
//! runs the chain, and hands back a normalized response.
//!
//! ## The contract
//!
//! The host (the function runtime and its HTTP gateway) already did the hard
//! parts: it matched the path against a template, extracted the path
//! parameters, and produced a route key such as `GET /agents/{id}`. relay
//! does not repeat that work. It owns:
//!
//! - **Exact route-key lookup** in registration order, with a fallback chain
//!   and a fixed 404 when there is neither.
//! - **Chain-of-responsibility execution**: every link gets a [`Next`] and
//!   either returns a response or calls `next.run(req)` explicitly.
//! - **Fault absorption**: errors and panics from links go to the error
//!   interceptor, or to the [`Normalizer`] as a 500. `dispatch` never fails.
//! - **Response normalization** into `{ statusCode, headers, body }` with
//!   JSON bodies, default CORS headers, and a debug switch for error details.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use relay::{Context, Event, Next, Outcome, Request, Response, Router};
//!
//! async fn auth(req: Request, _ctx: Context, next: Next) -> Outcome {
//!     match req.header("authorization") {
//!         Some(_) => next.run(req).await,
//!         None => Err("Unauthorized".into()),
//!     }
//! }
//!
//! async fn get_agent(req: Request, _ctx: Context, _next: Next) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_agent(req: Request, _ctx: Context, _next: Next) -> Outcome {
//!     let Some(body) = req.body() else {
//!         return Err("Body is required".into());
//!     };
//!     Ok(Some(Response::builder()
//!         .status(http::StatusCode::CREATED)
//!         .json(body.to_string())))
//! }
//!
//! # async fn host(event: Event, ctx: Context) {
//! let router = Router::new()
//!     .get("/agents/{id}", (auth, get_agent))
//!     .post("/agents", (auth, create_agent));
//!
//! let response = router.handle(event, ctx).await;
//! # }
//! ```

mod chain;
mod config;
mod error;
mod event;
mod fault;
mod handler;
mod normalize;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use chain::{Chain, IntoChain, Next};
pub use config::{Config, DEBUG_VAR};
pub use error::Error;
pub use event::{Context, Event, HttpDescription, RequestContext};
pub use fault::{Fault, VALIDATION_ERROR};
pub use handler::{Interceptor, IntoOutcome, Link, Outcome};
pub use normalize::{GENERIC_ERROR, Normalizer};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{NO_RESPONSE, ROUTE_NOT_FOUND, Router};
pub use server::{LOCAL_FUNCTION, Server};
