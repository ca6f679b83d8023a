//! Unified error type.

use crate::chain::NodeHandle;

/// The error type returned by tether's fallible operations.
///
/// Application-level failures (404, 422, etc.) are written into the
/// [`Response`](crate::Response) by middleware and handlers, not surfaced as
/// `Error`s. This type covers wiring mistakes and infrastructure failures:
/// a stale insertion anchor, a bad listen address, a socket that won't bind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// The anchor passed to a positional insert or removal is not a node of
    /// this chain.
    #[error("{0} is not registered in this chain")]
    UnknownAnchor(NodeHandle),
}
