//! Per-request tracing span.

use std::time::Instant;

use tracing::{info, info_span};

use super::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Opens an `info` span carrying method and path, runs the rest of the chain
/// inside it, then logs the final status and latency.
///
/// Register it first so the span encloses every other unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        let _entered = span.enter();
        let started = Instant::now();

        next.run(req, res);

        info!(
            status = res.status().as_u16(),
            latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request completed"
        );
    }

    fn name(&self) -> &'static str {
        "trace"
    }
}
