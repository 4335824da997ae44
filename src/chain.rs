//! Handler chains and the `Next` continuation.
//!
//! A chain is an ordered, non-empty list of links. Running one is a
//! chain-of-responsibility walk:
//!
//! - the link at the cursor is invoked with a [`Next`] pointing one past it;
//! - a link that returns a response ends the walk; remaining links never run;
//! - a link that wants downstream links to run calls `next.run(req).await`
//!   and returns (or rewrites) what comes back;
//! - running past the last link yields `Ok(None)`.
//!
//! The cursor lives inside `Next` itself and `run` consumes it, so every
//! dispatch walks its own chain position and a continuation cannot be
//! resumed twice.

use std::sync::Arc;

use tracing::trace;

use crate::event::Context;
use crate::fault::Fault;
use crate::handler::{BoxedLink, Link, Outcome, catch_panics};
use crate::request::Request;

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered, non-empty sequence of links.
///
/// Usually built implicitly from a tuple passed to a registration method;
/// build one explicitly when the length is only known at runtime:
///
/// ```rust
/// use relay::{Chain, Context, Next, Outcome, Request, Response};
///
/// async fn audit(req: Request, _ctx: Context, next: Next) -> Outcome {
///     next.run(req).await
/// }
///
/// async fn hello(_req: Request, _ctx: Context, _next: Next) -> Response {
///     Response::text("hello")
/// }
///
/// let chain = Chain::new(audit).then(audit).then(hello);
/// assert_eq!(chain.len(), 3);
/// ```
#[derive(Clone)]
pub struct Chain {
    links: Vec<BoxedLink>,
}

impl Chain {
    pub fn new(link: impl Link) -> Self {
        Self { links: vec![link.into_boxed_link()] }
    }

    /// Appends a link to the end of the chain.
    pub fn then(mut self, link: impl Link) -> Self {
        self.links.push(link.into_boxed_link());
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// A chain is never empty.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn into_links(self) -> Arc<[BoxedLink]> {
        self.links.into()
    }
}

// ── IntoChain ─────────────────────────────────────────────────────────────────

/// Anything a registration method accepts as a chain: a single link, a
/// tuple of up to eight links, or a [`Chain`].
///
/// `M` only disambiguates the implementations; callers never name it.
pub trait IntoChain<M> {
    fn into_chain(self) -> Chain;
}

impl IntoChain<Chain> for Chain {
    fn into_chain(self) -> Chain { self }
}

impl<L: Link> IntoChain<()> for L {
    fn into_chain(self) -> Chain { Chain::new(self) }
}

macro_rules! tuple_chain {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: Link, $($rest: Link),*> IntoChain<($first, $($rest,)*)> for ($first, $($rest,)*) {
            #[allow(non_snake_case)]
            fn into_chain(self) -> Chain {
                let ($first, $($rest,)*) = self;
                Chain::new($first)$(.then($rest))*
            }
        }
    };
}

tuple_chain!(A);
tuple_chain!(A, B);
tuple_chain!(A, B, C);
tuple_chain!(A, B, C, D);
tuple_chain!(A, B, C, D, E);
tuple_chain!(A, B, C, D, E, F);
tuple_chain!(A, B, C, D, E, F, G);
tuple_chain!(A, B, C, D, E, F, G, H);

// ── Next ──────────────────────────────────────────────────────────────────────

/// The continuation handed to every link.
///
/// Holds the selected chain, the position of the next link, and the
/// invocation context. Created fresh for every dispatch.
pub struct Next {
    links: Arc<[BoxedLink]>,
    cursor: usize,
    ctx: Context,
}

impl Next {
    pub(crate) fn new(links: Arc<[BoxedLink]>, ctx: Context) -> Self {
        Self { links, cursor: 0, ctx }
    }

    /// Runs the rest of the chain with `req`.
    ///
    /// Returns `Ok(None)` when no links are left. A panic inside a link is
    /// reported as a [`Fault`], the same as a returned error.
    pub async fn run(self, req: Request) -> Outcome {
        let Some(link) = self.links.get(self.cursor).cloned() else {
            return Ok(None);
        };
        trace!(position = self.cursor, of = self.links.len(), "entering link");

        let next = Self {
            links: Arc::clone(&self.links),
            cursor: self.cursor + 1,
            ctx: self.ctx.clone(),
        };
        let ctx = self.ctx;
        catch_panics(move || link.call(req, ctx, next))
            .await
            .unwrap_or_else(|panic| Err(Fault::from_panic(panic)))
    }

    /// Number of links `run` would still walk.
    pub fn remaining(&self) -> usize {
        self.links.len().saturating_sub(self.cursor)
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}
