//! Secondary index from objects to tags and back.
//!
//! Every `(oid, key, value)` fact is stored twice in one persistent map:
//!
//! ```text
//! forward:  'f' 0x00 <oid:32> <key>                        -> <value>
//! inverse:  'i' 0x00 <key> 0x00 <value> 0x00 <oid:32>      -> <oid>
//! ```
//!
//! Forward entries answer "what tags does this object have"; inverse
//! entries sort by key, then value, then OID, which is what lets queries
//! seek to a value range. The `0x00` separator is why tag keys and values
//! may not contain that byte.

pub mod backend;
pub mod error;
pub mod index;
mod keys;

pub use backend::IndexBackend;
pub use error::{IndexError, IndexResult};
pub use index::TagIndex;
