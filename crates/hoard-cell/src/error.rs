use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("cell payload too large: {size} bytes exceeds limit of {max}")]
    TooLarge { size: usize, max: usize },

    #[error("corrupt cell contents: {0}")]
    Corruption(String),

    /// Every attempt lost the race to another writer.
    #[error("cell update conflicted {attempts} times")]
    Conflict { attempts: u32 },

    #[error("cell serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cell lock poisoned")]
    Poisoned,
}

pub type CellResult<T> = Result<T, CellError>;
