//! # tether
//!
//! Continuation-passing middleware chains for HTTP services.
//!
//! Every inbound request is threaded through an ordered [`Chain`] of
//! [`Middleware`] units. Each unit sees the request and the response writer,
//! and decides whether and when the rest of the chain runs by calling (or not
//! calling) its [`Next`]. Code before `next.run` runs on the way in, code
//! after it on the way out:
//!
//! ```text
//! chain [A, B, C]      A_pre  B_pre  C_pre  C_post  B_post  A_post
//! B short-circuits     A_pre  B_pre                        A_post
//! ```
//!
//! ## What the chain does
//!
//! - Appends units in source order ([`Chain::use_middleware`],
//!   [`Chain::use_handler`]).
//! - Inserts relative to a previously registered node, addressed by the
//!   [`NodeHandle`] registration returned ([`Chain::insert_after`],
//!   [`Chain::insert_before`]).
//! - Splices whole chains in front or behind ([`Chain::prepend_chain`],
//!   [`Chain::append_chain`]).
//! - Dispatches synchronously: one request, one stack of nested calls, no
//!   suspension points.
//!
//! What it leaves to the host: the listener, request parsing, response
//! serialisation, and routing. [`Server`] and [`Router`] are the bundled
//! hosts; anything that can produce a [`Request`] and consume a [`Response`]
//! can drive a chain.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tether::middleware::{RequestId, Trace};
//! use tether::{Chain, Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tether::Error> {
//!     let mut chain = Chain::new();
//!     chain.use_middleware(Trace);
//!     chain.use_middleware(RequestId::new());
//!     chain.use_handler(Router::new().on(Method::GET, "/users/{id}", get_user));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(chain).await
//! }
//!
//! fn get_user(req: &mut Request, res: &mut Response) {
//!     let id = req.param("id").unwrap_or("unknown");
//!     res.json(format!(r#"{{"id":"{id}"}}"#).into_bytes());
//! }
//! ```

mod chain;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;

pub use chain::{Chain, NodeHandle};
pub use error::Error;
pub use handler::{adapt, handler_fn, Adapted, Handler, HandlerFn};
pub use middleware::{compose, Composed, Middleware, Next};
pub use request::Request;
pub use response::{ContentType, Response};
pub use router::Router;
pub use server::Server;

pub use http::{HeaderName, HeaderValue, Method, StatusCode};
