use hoard_store::{ObjectKind, StoreError};
use hoard_types::ObjectId;

/// Errors from persistent map operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A node or value referenced by the tree is absent from the store.
    #[error("missing tree object: {0}")]
    MissingObject(ObjectId),

    #[error("object {id} has kind {found}, expected {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("cannot decode node {id}: {reason}")]
    Decode { id: ObjectId, reason: String },

    #[error("cannot encode node: {0}")]
    Encode(String),

    /// A mutation batch was unsorted, overlapping, or had entries outside
    /// their span.
    #[error("invalid mutation batch: {0}")]
    InvalidMutation(String),
}

pub type KvResult<T> = Result<T, KvError>;
