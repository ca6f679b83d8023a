//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The router is a plain
//! [`Handler`]: it usually sits at the end of a [`Chain`](crate::Chain),
//! registered with `use_handler`, and everything in front of it is middleware.

use std::collections::HashMap;

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup. Each [`Router::on`] call returns `self` so
/// registrations chain naturally.
///
/// - No route for the path at all → `404 Not Found`.
/// - Path exists under other methods only → `405 Method Not Allowed` with an
///   `allow` header listing them.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use tether::{Method, Request, Response, Router};
    /// # fn get_user(_: &mut Request, _: &mut Response) {}
    /// # fn create_user(_: &mut Request, _: &mut Response) {}
    /// # fn delete_user(_: &mut Request, _: &mut Response) {}
    /// Router::new()
    ///     .on(Method::DELETE, "/users/{id}", delete_user)
    ///     .on(Method::GET,    "/users/{id}", get_user)
    ///     .on(Method::POST,   "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// wiring bug rather than a runtime condition.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Box::new(handler))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(&BoxedHandler, HashMap<String, String>)> {
        let matched = self.routes.get(method)?.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }

    /// Methods other than `method` that have a route matching `path`.
    fn allowed(&self, method: &Method, path: &str) -> Vec<&Method> {
        let mut allowed: Vec<&Method> = self.routes.iter()
            .filter(|(m, tree)| *m != method && tree.at(path).is_ok())
            .map(|(m, _)| m)
            .collect();
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        allowed
    }
}

impl Handler for Router {
    fn serve(&self, req: &mut Request, res: &mut Response) {
        if let Some((handler, params)) = self.lookup(&req.method, req.uri.path()) {
            req.params = params;
            handler.serve(req, res);
            return;
        }

        let allowed = self.allowed(&req.method, req.uri.path());
        if allowed.is_empty() {
            res.set_status(StatusCode::NOT_FOUND);
            return;
        }

        res.set_status(StatusCode::METHOD_NOT_ALLOWED);
        let list = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        if let Ok(value) = HeaderValue::try_from(list) {
            res.insert_header(ALLOW, value);
        }
    }
}
