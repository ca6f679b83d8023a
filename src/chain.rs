//! The middleware chain.
//!
//! # Storage
//!
//! A chain is a doubly linked list of nodes kept in a slot arena: each node
//! owns its unit plus the slot indices of its neighbours, and the chain keeps
//! `head`/`tail`. Node order *is* invocation order.
//!
//! ```text
//!            head                               tail
//!             ↓                                  ↓
//! slots:  [ A │·→1 ]  [ B │0←·→3 ]  [ free ]  [ D │1←· ]
//! ```
//!
//! Freed slots are recycled. Positional operations never take a unit; they
//! take the opaque [`NodeHandle`] returned when the anchor was registered,
//! resolved through a handle → slot index.
//!
//! # Dispatch
//!
//! [`Chain::dispatch`] materialises a [`Next`] bound to the head slot and runs
//! it. Each node, when invoked, builds a fresh `Next` bound to its successor
//! (or the terminal no-op) and hands it to its unit. The call stack grows by
//! one frame per node reached and unwinds back through every unit's
//! post-`next` code before `dispatch` returns.
//!
//! # Mutation vs. dispatch
//!
//! Mutators take `&mut self`, `dispatch` takes `&self`. The borrow checker
//! therefore rules out reshaping a chain while any dispatch on it is live.
//! To serve concurrently, finish wiring first, then share the chain behind an
//! `Arc` (which is what [`Server`](crate::Server) does); from then on it is
//! read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::error::Error;
use crate::handler::{adapt, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

// ── Node handles ──────────────────────────────────────────────────────────────

/// Opaque reference to a registered node, used as an insertion anchor.
///
/// Handles are unique for the whole process. A handle moves with its node
/// when one chain is spliced into another, so it stays a valid anchor in the
/// receiving chain.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl NodeHandle {
    fn fresh() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

struct Node {
    handle: NodeHandle,
    unit: BoxedMiddleware,
    prev: Option<usize>,
    next: Option<usize>,
}

/// An ordered, mutable sequence of middleware units.
///
/// ```rust
/// use tether::middleware::from_fn;
/// use tether::{Chain, Method, Request, Response};
///
/// let mut chain = Chain::new();
/// let logger = chain.use_middleware(from_fn(|req, res, next| {
///     res.write(b"log;");
///     next.run(req, res);
/// }));
/// chain.use_handler(|_req: &mut Request, res: &mut Response| res.write(b"app;"));
/// chain
///     .insert_after(from_fn(|req, res, next| { res.write(b"auth;"); next.run(req, res) }), logger)
///     .unwrap();
///
/// let mut res = Response::new();
/// chain.dispatch(&mut Request::new(Method::GET, "/"), &mut res);
/// assert_eq!(res.body(), b"log;auth;app;");
/// ```
#[derive(Default)]
pub struct Chain {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<NodeHandle, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Whether `handle` names a node of this chain.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.index.contains_key(&handle)
    }

    /// Handles of every node, in invocation order.
    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes().map(|node| node.handle)
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Appends `unit` as the new tail. Units added this way run in call order.
    pub fn use_middleware(&mut self, unit: impl Middleware) -> NodeHandle {
        self.use_shared(Arc::new(unit))
    }

    /// Appends a unit the caller keeps a clone of, e.g. to look it up again
    /// with [`find`](Chain::find).
    pub fn use_shared(&mut self, unit: BoxedMiddleware) -> NodeHandle {
        self.link(NodeHandle::fresh(), unit, self.tail, None)
    }

    /// Appends a plain handler. Same as `use_middleware(adapt(handler))`:
    /// the handler runs to completion, then the chain carries on.
    pub fn use_handler(&mut self, handler: impl Handler) -> NodeHandle {
        self.use_middleware(adapt(handler))
    }

    /// Inserts `unit` immediately after `anchor`.
    ///
    /// Fails with [`Error::UnknownAnchor`] if `anchor` is not a node of this
    /// chain; the chain is left untouched.
    pub fn insert_after(
        &mut self,
        unit: impl Middleware,
        anchor: NodeHandle,
    ) -> Result<NodeHandle, Error> {
        let at = self.resolve(anchor)?;
        let next = self.slot(at).and_then(|node| node.next);
        Ok(self.link(NodeHandle::fresh(), Arc::new(unit), Some(at), next))
    }

    /// Inserts `unit` immediately before `anchor`.
    ///
    /// Fails with [`Error::UnknownAnchor`] if `anchor` is not a node of this
    /// chain; the chain is left untouched.
    pub fn insert_before(
        &mut self,
        unit: impl Middleware,
        anchor: NodeHandle,
    ) -> Result<NodeHandle, Error> {
        let at = self.resolve(anchor)?;
        let prev = self.slot(at).and_then(|node| node.prev);
        Ok(self.link(NodeHandle::fresh(), Arc::new(unit), prev, Some(at)))
    }

    /// Unlinks `handle`'s node and returns its unit. Everything else keeps
    /// its relative order.
    pub fn remove(&mut self, handle: NodeHandle) -> Result<BoxedMiddleware, Error> {
        let at = self.resolve(handle)?;
        let node = self
            .slots
            .get_mut(at)
            .and_then(Option::take)
            .ok_or(Error::UnknownAnchor(handle))?;
        self.index.remove(&handle);
        self.free.push(at);

        match node.prev.and_then(|p| self.slot_mut(p)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|n| self.slot_mut(n)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }

        trace!(node = %handle, len = self.len(), "middleware removed");
        Ok(node.unit)
    }

    // ── Splicing ─────────────────────────────────────────────────────────────

    /// Moves all of `other`'s nodes, in their order, in front of the current
    /// head. Handles issued by `other` now anchor into `self`.
    pub fn prepend_chain(&mut self, other: Chain) {
        for (handle, unit) in other.into_nodes().into_iter().rev() {
            self.link(handle, unit, None, self.head);
        }
    }

    /// Moves all of `other`'s nodes, in their order, after the current tail.
    /// Handles issued by `other` now anchor into `self`.
    pub fn append_chain(&mut self, other: Chain) {
        for (handle, unit) in other.into_nodes() {
            self.link(handle, unit, self.tail, None);
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Finds the node holding exactly this unit instance.
    ///
    /// Compares by pointer, never by value: two separately registered but
    /// identical units are distinct nodes.
    pub fn find(&self, unit: &BoxedMiddleware) -> Option<NodeHandle> {
        let wanted = Arc::as_ptr(unit);
        self.nodes()
            .find(|node| std::ptr::addr_eq(Arc::as_ptr(&node.unit), wanted))
            .map(|node| node.handle)
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Runs `req`/`res` through the chain, front to back.
    ///
    /// Returns once the outermost unit returns. An empty chain is a no-op.
    pub fn dispatch(&self, req: &mut Request, res: &mut Response) {
        Next::node(self, self.head).run(req, res);
    }

    /// Invokes the unit stored at `at` with a continuation bound to its
    /// successor.
    pub(crate) fn invoke(&self, at: usize, req: &mut Request, res: &mut Response) {
        if let Some(node) = self.slot(at) {
            node.unit.handle(req, res, Next::node(self, node.next));
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn slot(&self, at: usize) -> Option<&Node> {
        self.slots.get(at).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, at: usize) -> Option<&mut Node> {
        self.slots.get_mut(at).and_then(Option::as_mut)
    }

    fn resolve(&self, handle: NodeHandle) -> Result<usize, Error> {
        self.index.get(&handle).copied().ok_or(Error::UnknownAnchor(handle))
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(self.head.and_then(|at| self.slot(at)), move |node| {
            node.next.and_then(|at| self.slot(at))
        })
    }

    /// Stores a node between `prev` and `next`, which must be adjacent (or
    /// the matching end of the list when `None`).
    fn link(
        &mut self,
        handle: NodeHandle,
        unit: BoxedMiddleware,
        prev: Option<usize>,
        next: Option<usize>,
    ) -> NodeHandle {
        let name = unit.name();
        let node = Node { handle, unit, prev, next };
        let at = match self.free.pop() {
            Some(at) => {
                self.slots[at] = Some(node);
                at
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match prev.and_then(|p| self.slot_mut(p)) {
            Some(prev) => prev.next = Some(at),
            None => self.head = Some(at),
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(next) => next.prev = Some(at),
            None => self.tail = Some(at),
        }
        self.index.insert(handle, at);

        trace!(node = %handle, unit = name, len = self.len(), "middleware registered");
        handle
    }

    /// Drains the chain into `(handle, unit)` pairs in invocation order.
    fn into_nodes(mut self) -> Vec<(NodeHandle, BoxedMiddleware)> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(at) = cursor {
            let Some(node) = self.slots.get_mut(at).and_then(Option::take) else {
                break;
            };
            cursor = node.next;
            out.push((node.handle, node.unit));
        }
        out
    }
}

/// A chain is itself a handler, so it can be mounted in another chain with
/// [`use_handler`](Chain::use_handler) or wrapped with
/// [`compose`](crate::compose).
impl Handler for Chain {
    fn serve(&self, req: &mut Request, res: &mut Response) {
        self.dispatch(req, res);
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes().map(|node| (node.handle, node.unit.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use crate::Method;

    /// Writes `{name}_pre ` then `{name}_post ` around the continuation.
    fn marker(name: &'static str) -> impl Middleware {
        from_fn(move |req, res, next| {
            res.write(format!("{name}_pre ").as_bytes());
            next.run(req, res);
            res.write(format!("{name}_post ").as_bytes());
        })
    }

    fn trace_of(chain: &Chain) -> String {
        let mut res = Response::new();
        chain.dispatch(&mut Request::new(Method::GET, "/"), &mut res);
        String::from_utf8(res.body().to_vec()).unwrap()
    }

    #[test]
    fn empty_chain() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        assert_eq!(trace_of(&chain), "");
    }

    #[test]
    fn links_stay_consistent_through_inserts() {
        let mut chain = Chain::new();
        let a = chain.use_middleware(marker("A"));
        let d = chain.use_middleware(marker("D"));
        let b = chain.insert_after(marker("B"), a).unwrap();
        let c = chain.insert_before(marker("C"), d).unwrap();
        let z = chain.insert_before(marker("Z"), a).unwrap();
        let e = chain.insert_after(marker("E"), d).unwrap();

        assert_eq!(chain.handles().collect::<Vec<_>>(), [z, a, b, c, d, e]);
        assert_eq!(chain.head, chain.index.get(&z).copied());
        assert_eq!(chain.tail, chain.index.get(&e).copied());
    }

    #[test]
    fn remove_relinks_neighbours_and_recycles_slot() {
        let mut chain = Chain::new();
        let a = chain.use_middleware(marker("A"));
        let b = chain.use_middleware(marker("B"));
        let c = chain.use_middleware(marker("C"));

        chain.remove(b).unwrap();
        assert_eq!(trace_of(&chain), "A_pre C_pre C_post A_post ");
        assert!(!chain.contains(b));
        assert!(matches!(chain.remove(b), Err(Error::UnknownAnchor(h)) if h == b));

        let x = chain.insert_after(marker("X"), c).unwrap();
        assert_eq!(chain.slots.len(), 3, "freed slot is reused");

        chain.remove(a).unwrap();
        chain.remove(x).unwrap();
        assert_eq!(chain.handles().collect::<Vec<_>>(), [c]);
        assert_eq!(chain.head, chain.tail);

        chain.remove(c).unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.tail, None);
    }

    #[test]
    fn splices_carry_handles_over() {
        let mut chain = Chain::new();
        chain.use_middleware(marker("B"));

        let mut front = Chain::new();
        let z = front.use_middleware(marker("Z"));
        chain.prepend_chain(front);

        let mut back = Chain::new();
        let y = back.use_middleware(marker("Y"));
        chain.append_chain(back);

        assert!(chain.contains(z));
        chain.insert_after(marker("Z2"), z).unwrap();
        chain.insert_before(marker("X"), y).unwrap();

        assert_eq!(
            trace_of(&chain),
            "Z_pre Z2_pre B_pre X_pre Y_pre Y_post X_post B_post Z2_post Z_post "
        );
    }

    #[test]
    fn splicing_an_empty_chain_changes_nothing() {
        let mut chain = Chain::new();
        chain.use_middleware(marker("A"));
        chain.prepend_chain(Chain::new());
        chain.append_chain(Chain::new());
        assert_eq!(chain.len(), 1);

        let mut empty = Chain::new();
        empty.prepend_chain(chain);
        assert_eq!(trace_of(&empty), "A_pre A_post ");
    }

    #[test]
    fn debug_lists_units_in_order() {
        let mut chain = Chain::new();
        chain.use_middleware(crate::middleware::Trace);
        chain.use_middleware(crate::middleware::RequestId::new());

        let shown = format!("{chain:?}");
        assert!(shown.find("trace").unwrap() < shown.find("request_id").unwrap());
    }
}
