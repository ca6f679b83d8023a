//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection,
//! authentication-header inspection, early rejection.
//!
//! A unit receives the request, the response writer, and a [`Next`]: the
//! continuation standing for "the rest of the chain". It may work before
//! calling `next.run`, after it, both, or never call it at all, which ends
//! the traversal right there:
//!
//! ```text
//! A_pre ─▶ B_pre ─▶ C_pre ─▶ (terminal no-op)
//!                             │
//! A_post ◀─ B_post ◀─ C_post ◀┘
//! ```
//!
//! `Next::run` takes `self`, so a continuation can be invoked at most once.
//! Calling it twice does not compile.
//!
//! Built-in middleware:
//! - [`Trace`] — per-request span with method, path, status, latency
//! - [`RequestId`] — propagate or mint an `x-request-id`

mod request_id;
mod trace;

pub use request_id::{RequestId, REQUEST_ID_HEADER};
pub use trace::Trace;

use std::sync::Arc;

use crate::chain::Chain;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// A type-erased middleware unit shared by a chain and anyone holding a
/// clone for [`Chain::find`].
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ── Middleware trait ──────────────────────────────────────────────────────────

/// A unit of a [`Chain`].
///
/// Implemented automatically for functions shaped
/// `fn(&mut Request, &mut Response, Next<'_>)`; closures go through
/// [`from_fn`].
///
/// # Contract
///
/// - Call `next.run(req, res)` at most once; not calling it short-circuits
///   everything downstream.
/// - Panics propagate straight out of [`Chain::dispatch`]. The chain does not
///   catch, log or translate them.
///
/// ```rust
/// use tether::{Chain, Method, Middleware, Next, Request, Response, StatusCode};
///
/// struct RequireAuth;
///
/// impl Middleware for RequireAuth {
///     fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
///         if req.header("authorization").is_none() {
///             res.set_status(StatusCode::UNAUTHORIZED);
///             return;
///         }
///         next.run(req, res);
///     }
/// }
///
/// let mut chain = Chain::new();
/// chain.use_middleware(RequireAuth);
///
/// let mut res = Response::new();
/// chain.dispatch(&mut Request::new(Method::GET, "/"), &mut res);
/// assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>);

    /// Name used in diagnostics such as `Debug` output of a [`Chain`].
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        self(req, res, next)
    }
}

/// Newtype returned by [`from_fn`].
pub struct MiddlewareFn<F>(F);

/// Turns a closure into [`Middleware`].
///
/// ```rust
/// use tether::middleware::from_fn;
/// use tether::Chain;
///
/// let mut chain = Chain::new();
/// chain.use_middleware(from_fn(|req, res, next| {
///     res.write(b"before;");
///     next.run(req, res);
///     res.write(b"after;");
/// }));
/// ```
pub fn from_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    MiddlewareFn(f)
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        (self.0)(req, res, next)
    }
}

// ── Continuation ──────────────────────────────────────────────────────────────

/// The rest of the chain, bound at dispatch time.
///
/// Every unit gets a valid, callable `Next`, including the last one, whose
/// continuation is the terminal no-op.
#[must_use = "dropping `Next` without calling `run` short-circuits the chain"]
pub struct Next<'a> {
    step: Step<'a>,
}

enum Step<'a> {
    /// Node stored at `at` in `chain`'s slots.
    Node { chain: &'a Chain, at: usize },
    /// Downstream of a [`Composed`] decorator.
    Handler(&'a dyn Handler),
    Terminal,
}

impl<'a> Next<'a> {
    /// The terminal continuation. Invoking it does nothing.
    ///
    /// Zero-sized and stateless; every chain on every thread hands out the
    /// same one.
    pub const fn terminal() -> Self {
        Self { step: Step::Terminal }
    }

    pub(crate) fn node(chain: &'a Chain, at: Option<usize>) -> Self {
        match at {
            Some(at) => Self { step: Step::Node { chain, at } },
            None => Self::terminal(),
        }
    }

    pub(crate) fn handler(handler: &'a dyn Handler) -> Self {
        Self { step: Step::Handler(handler) }
    }

    /// `true` when nothing follows: running this continuation is a no-op.
    pub fn is_terminal(&self) -> bool {
        matches!(self.step, Step::Terminal)
    }

    /// Hands the request to the rest of the chain and returns once it unwinds.
    ///
    /// Consumes the continuation, so a unit cannot run the rest of the chain
    /// twice:
    ///
    /// ```compile_fail,E0382
    /// use tether::middleware::from_fn;
    ///
    /// let twice = from_fn(|req, res, next| {
    ///     next.run(req, res);
    ///     next.run(req, res);
    /// });
    /// ```
    pub fn run(self, req: &mut Request, res: &mut Response) {
        match self.step {
            Step::Node { chain, at } => chain.invoke(at, req, res),
            Step::Handler(handler) => handler.serve(req, res),
            Step::Terminal => {}
        }
    }
}

// ── Compose ───────────────────────────────────────────────────────────────────

/// A unit wrapped around a downstream handler. Built by [`compose`].
pub struct Composed<M, H> {
    unit: M,
    downstream: H,
}

/// Turns `unit` into a decorator over a single downstream handler.
///
/// `compose(m)(h)` is a [`Handler`] that runs `m` with a continuation calling
/// `h`: the same trace as dispatching a two-node chain `[m, adapt(h)]`, with
/// no chain allocated. Nest it to build short pipelines by hand:
///
/// ```rust
/// use tether::middleware::{from_fn, Trace};
/// use tether::{compose, Handler, Method, Request, Response};
///
/// fn hello(_req: &mut Request, res: &mut Response) {
///     res.text("hello");
/// }
///
/// let tagged = from_fn(|req, res, next| {
///     next.run(req, res);
///     res.write(b"!");
/// });
/// let app = compose(Trace)(compose(tagged)(hello));
///
/// let mut res = Response::new();
/// app.serve(&mut Request::new(Method::GET, "/"), &mut res);
/// assert_eq!(res.body(), b"hello!");
/// ```
pub fn compose<M, H>(unit: M) -> impl FnOnce(H) -> Composed<M, H>
where
    M: Middleware,
    H: Handler,
{
    move |downstream| Composed { unit, downstream }
}

impl<M: Middleware, H: Handler> Handler for Composed<M, H> {
    fn serve(&self, req: &mut Request, res: &mut Response) {
        self.unit.handle(req, res, Next::handler(&self.downstream));
    }
}
