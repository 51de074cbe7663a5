//! Hoard: a content-addressed archive with a tag index.
//!
//! Raw objects are stored under the BLAKE3 hash of their bytes (the
//! [`Oid`]); metadata is a set of `key=value` [`Tag`]s per object, indexed
//! both by object and by tag so that predicate [`Query`]s can find objects
//! by their tags. Both maps are persistent snapshots; the pair of roots is
//! committed through one compare-and-swap [`Cell`](hoard_cell::Cell), which
//! makes every [`Hoard::add`] atomic.
//!
//! ```no_run
//! use hoard::{ContentTypeExtractor, Hoard, HoardConfig, Predicate, Query};
//!
//! # fn main() -> hoard::HoardResult<()> {
//! let hoard = Hoard::open_dir("archive", HoardConfig::default())?
//!     .with_extractor(ContentTypeExtractor);
//! let oid = hoard.add(b"hello")?;
//! let texts = hoard.search(&Query::new(Predicate::eq("format", "text")))?;
//! assert!(texts.contains(&oid));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
mod hoard;
pub mod state;

pub use crate::hoard::Hoard;
pub use config::HoardConfig;
pub use error::{HoardError, HoardResult};
pub use extract::{ContentTypeExtractor, ExtractError, Extractor, FnExtractor};
pub use state::State;

pub use hoard_cell::RetryPolicy;
pub use hoard_kv::{KvConfig, Root, Span};
pub use hoard_query::{Predicate, Query, QueryConfig, ResultSet};
pub use hoard_types::{Oid, Tag, TagSet};
