//! Persistent ordered byte-string map for Hoard.
//!
//! Every snapshot of the map is an immutable tree of nodes stored in an
//! [`ObjectStore`](hoard_store::ObjectStore) and named by a [`Root`].
//! Mutating a map never touches an existing node: it writes new nodes along
//! the changed paths and returns a new `Root`, leaving every previous root
//! readable. Readers need no locking.
//!
//! # Key Types
//!
//! - [`Kv`] -- operator bound to a store; all reads and writes go through it
//! - [`Root`] -- handle to one snapshot
//! - [`Span`] -- half-open key range `[begin, end)`
//! - [`Mutation`] -- replace one span with a sorted list of entries
//!
//! Keys sort in plain lexicographic byte order.

pub mod config;
pub mod error;
mod node;
pub mod span;
pub mod tree;

pub use config::KvConfig;
pub use error::{KvError, KvResult};
pub use span::{key_after, prefix_end, Span};
pub use tree::{Entry, Kv, Mutation, Root};
