//! The commit point for Hoard state.
//!
//! A [`Cell`] holds one small byte string and changes only through
//! compare-and-swap. [`apply`] builds optimistic transactions on top of it:
//! read, compute, swap, and on a lost race start again from the fresh
//! contents.
//!
//! # Backends
//!
//! - [`InMemoryCell`] -- mutex-guarded buffer
//! - [`FileCell`] -- one checksummed file replaced by atomic rename

pub mod apply;
pub mod cell;
pub mod error;
pub mod file;
pub mod memory;

pub use apply::{apply, RetryPolicy};
pub use cell::Cell;
pub use error::{CellError, CellResult};
pub use file::FileCell;
pub use memory::InMemoryCell;
