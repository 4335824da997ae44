//! Built-in middleware.
//!
//! Middleware are ordinary chain links that call `next.run(req)` and look at
//! (or rewrite) what comes back. Put them first in a chain:
//!
//! ```rust,no_run
//! use relay::{Context, Next, Request, Response, Router, middleware};
//!
//! async fn list_agents(_req: Request, _ctx: Context, _next: Next) -> Response {
//!     Response::json("[]")
//! }
//!
//! let app = Router::new().get("/agents", (middleware::trace, list_agents));
//! ```

mod trace;

pub use trace::trace;
