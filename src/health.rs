//! Built-in Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router:
//!
//! ```rust
//! use tether::{health, Method, Router};
//!
//! let app = Router::new()
//!     .on(Method::GET, "/healthz", health::liveness)
//!     .on(Method::GET, "/readyz",  health::readiness);
//! ```

use crate::{Request, Response};

/// Liveness probe handler.
///
/// Always `200 OK` with body `"ok"`. If the process can respond to HTTP at
/// all, it is alive; this handler intentionally has no dependencies.
pub fn liveness(_req: &mut Request, res: &mut Response) {
    res.text("ok");
}

/// Readiness probe handler (default implementation).
///
/// `200 OK` with body `"ready"`. Replace it with your own handler if the
/// application needs a warm-up period or must verify dependency health first.
pub fn readiness(_req: &mut Request, res: &mut Response) {
    res.text("ready");
}
