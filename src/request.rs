//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri};

/// An incoming HTTP request with its body fully buffered.
///
/// Middleware receives it as `&mut Request`: headers, extensions and route
/// params may be rewritten on the way down the chain and are visible to every
/// unit that runs afterwards.
#[derive(Debug, Default)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) extensions: Extensions,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request with no headers and an empty body.
    ///
    /// Hosts other than the bundled [`Server`](crate::Server) and tests use
    /// this to feed a [`Chain`](crate::Chain) directly. An unparsable `uri`
    /// falls back to `/`.
    ///
    /// ```rust
    /// use tether::{Method, Request};
    ///
    /// let req = Request::new(Method::GET, "/users/42?verbose=1");
    /// assert_eq!(req.path(), "/users/42");
    /// assert_eq!(req.query(), Some("verbose=1"));
    /// ```
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.parse().unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Assembles a request from the parts hyper hands the server.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Per-request typed storage shared by every unit in the chain.
    ///
    /// This is where request-scoped context lives, a cancellation flag for
    /// instance, which a unit checks before deciding to call `next`.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter filled in by the [`Router`](crate::Router).
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
