//! Plain handlers and the adapter that lets a chain hold them.
//!
//! A [`Handler`] fully handles a request: it gets the request and the
//! response writer and has no notion of "the rest of the chain". A chain only
//! stores [`Middleware`], so handlers go in through [`adapt`], which runs the
//! handler to completion and then unconditionally calls the continuation.
//!
//! ```text
//! fn hello(req: &mut Request, res: &mut Response) { … }   ← user writes this
//!        ↓ chain.use_handler(hello)
//! adapt(hello)                                           ← Adapted<H>: Middleware
//!        ↓ stored as Arc<dyn Middleware>
//! unit.handle(req, res, next)  at dispatch time          ← one vtable call
//!        ↓
//! hello(req, res); next.run(req, res)
//! ```

use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// A heap-allocated, type-erased handler.
pub(crate) type BoxedHandler = Box<dyn Handler>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Something that fully handles a request.
///
/// Implemented automatically for any function with the signature:
///
/// ```text
/// fn name(req: &mut Request, res: &mut Response)
/// ```
///
/// Closures whose argument types can't be inferred at the call site go
/// through [`handler_fn`] instead. [`Router`](crate::Router),
/// [`Chain`](crate::Chain) and [`Composed`](crate::Composed) are handlers too,
/// so any of them can sit wherever a single handler is expected.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, req: &mut Request, res: &mut Response);
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    fn serve(&self, req: &mut Request, res: &mut Response) {
        self(req, res)
    }
}

/// Newtype returned by [`handler_fn`].
pub struct HandlerFn<F>(F);

/// Turns a closure into a [`Handler`].
///
/// ```rust
/// use tether::{handler_fn, Handler, Method, Request, Response};
///
/// let greeting = String::from("hi");
/// let hello = handler_fn(move |_req, res| res.text(greeting.clone()));
///
/// let mut res = Response::new();
/// hello.serve(&mut Request::new(Method::GET, "/"), &mut res);
/// assert_eq!(res.body(), b"hi");
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    fn serve(&self, req: &mut Request, res: &mut Response) {
        (self.0)(req, res)
    }
}

// ── Adapter ───────────────────────────────────────────────────────────────────

/// A [`Handler`] dressed up as [`Middleware`]. Built by [`adapt`].
pub struct Adapted<H>(H);

/// Wraps `handler` so it can be registered in a chain.
///
/// The resulting unit runs the handler synchronously to completion, then
/// always calls `next`. Downstream units therefore still run after a plain
/// handler, and see whatever it wrote.
pub fn adapt<H: Handler>(handler: H) -> Adapted<H> {
    Adapted(handler)
}

impl<H: Handler> Middleware for Adapted<H> {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        self.0.serve(req, res);
        next.run(req, res);
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<H>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use crate::{compose, Method};

    fn teapot(_req: &mut Request, res: &mut Response) {
        res.set_status(http::StatusCode::IM_A_TEAPOT);
        res.write(b"handler;");
    }

    #[test]
    fn adapted_handler_runs_before_continuation() {
        let after = compose(adapt(teapot))(handler_fn(|_req, res| res.write(b"next;")));

        let mut res = Response::new();
        after.serve(&mut Request::new(Method::GET, "/"), &mut res);

        assert_eq!(res.body(), b"handler;next;");
        assert_eq!(res.status(), http::StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn adapted_handler_with_terminal_continuation() {
        let mut res = Response::new();
        adapt(teapot).handle(&mut Request::new(Method::GET, "/"), &mut res, Next::terminal());
        assert_eq!(res.body(), b"handler;");
    }

    #[test]
    fn adapted_name_reports_wrapped_handler() {
        assert!(adapt(teapot).name().contains("teapot"));
        assert!(from_fn(|_req, _res, _next| {}).name().contains("MiddlewareFn"));
    }
}
