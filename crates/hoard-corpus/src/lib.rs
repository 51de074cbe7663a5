//! The Hoard corpus: a content-addressed map from [`Oid`](hoard_types::Oid)
//! to raw object bytes, stored in a persistent ordered map keyed by the
//! 32 OID bytes.
//!
//! A [`Corpus`] is a pure function of the [`Root`](hoard_kv::Root) it is
//! handed, so any number of readers may share one without locking.

pub mod corpus;
pub mod error;

pub use corpus::Corpus;
pub use error::{CorpusError, CorpusResult};
