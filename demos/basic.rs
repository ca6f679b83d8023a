//! Minimal tether example: a middleware chain in front of JSON endpoints.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -i http://localhost:3000/admin/stats
//!   curl -i http://localhost:3000/healthz

use tether::middleware::{RequestId, Trace};
use tether::{
    health, Chain, HeaderName, HeaderValue, Method, Next, Request, Response, Router, Server,
    StatusCode,
};

#[tokio::main]
async fn main() -> Result<(), tether::Error> {
    tracing_subscriber::fmt::init();

    let mut chain = Chain::new();
    let request_id = chain.use_middleware(RequestId::new());
    chain.use_handler(
        Router::new()
            .on(Method::GET,    "/users/{id}", get_user)
            .on(Method::POST,   "/users",      create_user)
            .on(Method::DELETE, "/users/{id}", delete_user)
            .on(Method::GET,    "/healthz",    health::liveness)
            .on(Method::GET,    "/readyz",     health::readiness),
    );

    // Registered after the router, but placed right behind the request-id
    // unit so rejected requests still carry an ID.
    chain.insert_after(deny_admin, request_id)?;

    // Tracing wraps everything, including the units above.
    let mut outer = Chain::new();
    outer.use_middleware(Trace);
    chain.prepend_chain(outer);

    Server::bind("0.0.0.0:3000")?.serve(chain).await
}

fn deny_admin(req: &mut Request, res: &mut Response, next: Next<'_>) {
    if req.path().starts_with("/admin") {
        res.set_status(StatusCode::FORBIDDEN);
        return;
    }
    next.run(req, res);
}

// GET /users/{id}
fn get_user(req: &mut Request, res: &mut Response) {
    let id = req.param("id").unwrap_or("unknown");
    res.json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes());
}

// POST /users
//
// req.body() is &[u8]; parse with serde_json::from_slice, simd-json, etc.
fn create_user(req: &mut Request, res: &mut Response) {
    if req.body().is_empty() {
        res.set_status(StatusCode::BAD_REQUEST);
        return;
    }
    res.set_status(StatusCode::CREATED);
    res.insert_header(HeaderName::from_static("location"), HeaderValue::from_static("/users/99"));
    res.json(br#"{"id":"99","name":"new_user"}"#.to_vec());
}

// DELETE /users/{id} → 204 No Content
fn delete_user(_req: &mut Request, res: &mut Response) {
    res.set_status(StatusCode::NO_CONTENT);
}
