//! Request ID propagation.
//!
//! Every request leaves with an `x-request-id` response header. Where the ID
//! comes from depends on how the unit was built:
//!
//! 1. [`RequestId::trusting_incoming`]: reuse the caller's header when it holds
//!    a valid UUID.
//! 2. Otherwise a fresh UUID v4 is minted.
//!
//! The ID is also written onto the request headers before `next` runs, so
//! downstream units and handlers read it with `req.header("x-request-id")`.

use http::{HeaderName, HeaderValue};
use uuid::Uuid;

use super::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The default header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that assigns each request an ID and echoes it on the response.
#[derive(Clone, Debug)]
pub struct RequestId {
    header: HeaderName,
    trust_incoming: bool,
}

impl RequestId {
    /// Always mints a new ID, ignoring whatever the client sent.
    pub fn new() -> Self {
        Self {
            header: HeaderName::from_static(REQUEST_ID_HEADER),
            trust_incoming: false,
        }
    }

    /// Keeps a valid inbound ID. Use behind a proxy that already assigns them.
    pub fn trusting_incoming() -> Self {
        Self { trust_incoming: true, ..Self::new() }
    }

    /// Uses `header` instead of `x-request-id`.
    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    fn incoming(&self, req: &Request) -> Option<Uuid> {
        if !self.trust_incoming {
            return None;
        }
        let value = req.headers().get(&self.header)?;
        Uuid::parse_str(value.to_str().ok()?).ok()
    }
}

/// Renders `id` in its lowercase hyphenated form.
fn header_value(id: Uuid) -> HeaderValue {
    HeaderValue::from_str(&id.hyphenated().to_string())
        .expect("hyphenated UUID is a valid header value")
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestId {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        let id = header_value(self.incoming(req).unwrap_or_else(Uuid::new_v4));

        req.headers_mut().insert(self.header.clone(), id.clone());
        next.run(req, res);
        res.insert_header(self.header.clone(), id);
    }

    fn name(&self) -> &'static str {
        "request_id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compose, Handler, Method};

    const KNOWN: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    fn echo(req: &mut Request, res: &mut Response) {
        let seen = req.header(REQUEST_ID_HEADER).unwrap_or_default().to_owned();
        res.text(seen);
    }

    fn run(unit: RequestId, req: Request) -> Response {
        let mut req = req;
        let mut res = Response::new();
        compose(unit)(echo).serve(&mut req, &mut res);
        res
    }

    #[test]
    fn mints_id_visible_downstream_and_on_response() {
        let res = run(RequestId::new(), Request::new(Method::GET, "/"));

        let echoed = res.header(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(echoed).is_ok());
        assert_eq!(res.body(), echoed.as_bytes());
    }

    #[test]
    fn ignores_incoming_id_by_default() {
        let req = Request::new(Method::GET, "/")
            .with_header(HeaderName::from_static(REQUEST_ID_HEADER), HeaderValue::from_static(KNOWN));
        let res = run(RequestId::new(), req);

        assert_ne!(res.header(REQUEST_ID_HEADER), Some(KNOWN));
    }

    #[test]
    fn trusted_incoming_id_is_kept() {
        let req = Request::new(Method::GET, "/")
            .with_header(HeaderName::from_static(REQUEST_ID_HEADER), HeaderValue::from_static(KNOWN));
        let res = run(RequestId::trusting_incoming(), req);

        assert_eq!(res.header(REQUEST_ID_HEADER), Some(KNOWN));
        assert_eq!(res.body(), KNOWN.as_bytes());
    }

    #[test]
    fn trusted_but_malformed_id_is_replaced() {
        let req = Request::new(Method::GET, "/")
            .with_header(HeaderName::from_static(REQUEST_ID_HEADER), HeaderValue::from_static("nope"));
        let res = run(RequestId::trusting_incoming(), req);

        let id = res.header(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn every_request_leaves_with_a_canonical_id() {
        let upper = KNOWN.to_ascii_uppercase();
        let req = Request::new(Method::GET, "/").with_header(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(&upper).unwrap(),
        );
        let res = run(RequestId::trusting_incoming(), req);
        assert_eq!(res.header(REQUEST_ID_HEADER), Some(KNOWN));
        assert_eq!(res.body(), KNOWN.as_bytes());

        for _ in 0..16 {
            let res = run(RequestId::new(), Request::new(Method::GET, "/"));
            let id = res.header(REQUEST_ID_HEADER).unwrap();
            assert_eq!(Uuid::parse_str(id).unwrap().hyphenated().to_string(), id);
        }
    }

    #[test]
    fn custom_header_name() {
        let unit = RequestId::new().with_header(HeaderName::from_static("x-correlation-id"));
        let res = run(unit, Request::new(Method::GET, "/"));

        assert!(res.header("x-correlation-id").is_some());
        assert_eq!(res.header(REQUEST_ID_HEADER), None);
    }
}
