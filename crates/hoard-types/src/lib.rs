//! Foundation types for Hoard.
//!
//! Every other Hoard crate depends on `hoard-types`.
//!
//! # Key Types
//!
//! - [`Oid`]: fingerprint of an archived object (BLAKE3 of its raw bytes)
//! - [`ObjectId`]: address of an internal storage object (tree node or blob)
//! - [`Tag`]: a `(key, value)` metadata fact attached to an [`Oid`]

pub mod error;
pub mod id;
pub mod tag;

pub use error::TypeError;
pub use id::{ObjectId, Oid, OID_LEN};
pub use tag::{Tag, TagSet, SEPARATOR};
