use hoard_types::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Bytes read back under `id` hash to a different ID.
    #[error("object {id} fails verification: contents hash to {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
