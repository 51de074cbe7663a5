//! Predicate queries over a tag index.
//!
//! A [`Query`] is a tree of [`Predicate`]s: comparisons on one tag key
//! (`=`, `<`, `>`, `CONTAINS`, `REGEXP`, `IN`), the constants `ANY` and
//! `NONE`, and the combinators `AND` and `OR`. [`execute`] evaluates a query
//! against any index that implements [`QueryBackend`] and returns a
//! bounded, deduplicated [`ResultSet`].
//!
//! The first term of an `AND` scans the inverse index; every later term
//! only probes the OIDs that survived so far.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod predicate;
pub mod wire;

pub use backend::QueryBackend;
pub use config::QueryConfig;
pub use engine::{execute, ResultSet};
pub use error::{QueryError, QueryResult};
pub use predicate::{Predicate, Query};
pub use wire::{WirePredicate, WireQuery};
