//! Content-addressed object storage for Hoard.
//!
//! Persistent map nodes, and values too large to sit inline in a leaf, are
//! written here as immutable [`StoredObject`]s. Each object is named by a
//! BLAKE3 key derivation over its bytes, with one context per
//! [`ObjectKind`].
//!
//! Backends:
//!
//! - [`InMemoryObjectStore`] -- for tests and short-lived instances
//! - [`FsObjectStore`] -- one file per object, fanned out by ID prefix
//!
//! There is no delete. Objects no longer reachable from any committed root
//! simply stay behind.

pub mod error;
pub mod fs;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use hasher::ContentHasher;
pub use memory::{InMemoryObjectStore, StoreStats};
pub use object::{ObjectKind, StoredObject};
pub use traits::ObjectStore;
