use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A tag key or value contains the reserved `0x00` separator.
    #[error("tag {field} contains reserved 0x00 byte: {tag}")]
    ReservedByte { field: &'static str, tag: String },
}
