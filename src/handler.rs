//! Chain links, error interceptors, and their type erasure.
//!
//! # One shape for handlers and middleware
//!
//! Every link in a chain is an async function of the same shape:
//!
//! ```text
//! async fn name(req: Request, ctx: Context, next: Next) -> impl IntoOutcome
//! ```
//!
//! A middleware calls `next.run(req).await` to hand control downstream and
//! returns (or inspects) the result. A terminal handler simply never touches
//! `next`. There is no arity inspection: the router always supplies `next`.
//!
//! # How links are stored
//!
//! The router holds links of many concrete types in one `Vec`, so each one is
//! erased behind `dyn ErasedLink` exactly once, at registration:
//!
//! ```text
//! async fn auth(req, ctx, next) -> Outcome { … }  ← user writes this
//!        ↓ router.get("/agents/{id}", (auth, get_agent))
//! auth.into_boxed_link()                          ← Link blanket impl
//!        ↓
//! Arc::new(FnLink(auth))                          ← stored as BoxedLink
//!        ↓
//! link.call(req, ctx, next)  at request time      ← one vtable dispatch
//!        ↓
//! Box::pin(async { auth(req, ctx, next).await.into_outcome() })
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt as _;
use http::StatusCode;

use crate::chain::Next;
use crate::event::Context;
use crate::fault::Fault;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// What a link produces: a final response, nothing (the chain continues to
/// be unwound by whoever called `next`), or a fault.
pub type Outcome = Result<Option<Response>, Fault>;

// ── Internal types ────────────────────────────────────────────────────────────

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedLink {
    fn call(&self, req: Request, ctx: Context, next: Next) -> BoxFuture<Outcome>;
}

/// A type-erased link shared across concurrent invocations.
#[doc(hidden)]
pub type BoxedLink = Arc<dyn ErasedLink + Send + Sync + 'static>;

#[doc(hidden)]
pub trait ErasedInterceptor {
    fn call(&self, fault: Fault, req: Request, ctx: Context) -> BoxFuture<Response>;
}

#[doc(hidden)]
pub type BoxedInterceptor = Arc<dyn ErasedInterceptor + Send + Sync + 'static>;

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion of a link's return value into an [`Outcome`].
///
/// `Result<T, E>` works for any `E: Into<Fault>`, so `?` on strings,
/// `serde_json::Value`s, I/O and JSON errors just works inside links.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Outcome { Ok(Some(self)) }
}

impl IntoOutcome for Option<Response> {
    fn into_outcome(self) -> Outcome { Ok(self) }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Outcome { Ok(Some(self.into_response())) }
}

/// A link that finishes without producing anything.
impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome { Ok(None) }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<Fault>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => value.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid chain link.
///
/// You never implement this yourself; it is satisfied by any function with
/// the signature `Fn(Request, Context, Next) -> impl Future<Output = impl IntoOutcome>`.
/// Closures need their argument types spelled out.
pub trait Link: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_link(self) -> BoxedLink;
}

/// Implemented for every valid error interceptor:
/// `Fn(Fault, Request, Context) -> impl Future<Output = impl IntoResponse>`.
///
/// The request is the one the chain started with, body already parsed.
pub trait Interceptor: private::SealedInterceptor + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_interceptor(self) -> BoxedInterceptor;
}

mod private {
    pub trait Sealed {}
    pub trait SealedInterceptor {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
}

impl<F, Fut, R> Link for F
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
    fn into_boxed_link(self) -> BoxedLink {
        Arc::new(FnLink(self))
    }
}

impl<F, Fut, R> private::SealedInterceptor for F
where
    F: Fn(Fault, Request, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
}

impl<F, Fut, R> Interceptor for F
where
    F: Fn(Fault, Request, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn into_boxed_interceptor(self) -> BoxedInterceptor {
        Arc::new(FnInterceptor(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

struct FnLink<F>(F);

impl<F, Fut, R> ErasedLink for FnLink<F>
where
    F: Fn(Request, Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
    fn call(&self, req: Request, ctx: Context, next: Next) -> BoxFuture<Outcome> {
        let fut = (self.0)(req, ctx, next);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

struct FnInterceptor<F>(F);

impl<F, Fut, R> ErasedInterceptor for FnInterceptor<F>
where
    F: Fn(Fault, Request, Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn call(&self, fault: Fault, req: Request, ctx: Context) -> BoxFuture<Response> {
        let fut = (self.0)(fault, req, ctx);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Runs `call` and awaits the future it returns, turning a panic in either
/// step into an `Err` carrying the panic payload.
pub(crate) async fn catch_panics<T, Fut>(call: impl FnOnce() -> Fut) -> Result<T, Box<dyn Any + Send>>
where
    Fut: Future<Output = T>,
{
    let fut = std::panic::catch_unwind(AssertUnwindSafe(call))?;
    AssertUnwindSafe(fut).catch_unwind().await
}
