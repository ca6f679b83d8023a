//! Outgoing HTTP response writer.
//!
//! The chain hands every unit the same `&mut Response`. Nobody returns a
//! response; each unit writes into this one in place, and whatever it holds
//! when [`Chain::dispatch`](crate::Chain::dispatch) returns is what the host
//! sends.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        })
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response, mutated in place as it travels through a chain.
///
/// Starts out as `200 OK` with no headers and an empty body.
///
/// ```rust
/// use tether::{ContentType, Response, StatusCode};
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.json(br#"{"id":42}"#.to_vec());
/// assert_eq!(res.header("content-type"), Some("application/json"));
///
/// res.bytes(ContentType::Xml, b"<ok/>".to_vec());
/// assert_eq!(res.body(), b"<ok/>");
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn set_status(&mut self, status: StatusCode) { self.status = status; }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets `name`, replacing any earlier value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Appends `chunk` to the body. Content type is left alone.
    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Replaces the body with `application/json` bytes.
    ///
    /// Pass bytes straight from your serialiser:
    /// - serde_json: `serde_json::to_vec(&val)?`
    /// - hand-built: `format!(r#"{{"id":{id}}}"#).into_bytes()`
    pub fn json(&mut self, body: Vec<u8>) {
        self.bytes(ContentType::Json, body);
    }

    /// Replaces the body with `text/plain; charset=utf-8` content.
    pub fn text(&mut self, body: impl Into<String>) {
        self.bytes(ContentType::Text, body.into().into_bytes());
    }

    /// Replaces the body and sets its content type. Use this for XML, HTML,
    /// binary, SSE, etc.
    pub fn bytes(&mut self, content_type: ContentType, body: Vec<u8>) {
        self.headers.insert(CONTENT_TYPE, content_type.header_value());
        self.body = body;
    }

    /// Converts into the hyper response the server writes to the socket.
    /// `content-length` is derived from the body by hyper.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(Bytes::from(self.body)));
        *out.status_mut() = self.status;
        *out.headers_mut() = self.headers;
        out
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Self { status, ..Self::default() }
    }
}
