use hoard_kv::KvError;
use hoard_types::Oid;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("object not found: {0}")]
    NotFound(Oid),

    #[error("object too large: {size} bytes exceeds limit of {max}")]
    TooLarge { size: usize, max: usize },

    #[error("no object matches prefix {0}")]
    NoMatch(String),

    #[error("prefix {prefix} is ambiguous ({count} matches)")]
    Ambiguous { prefix: String, count: usize },

    #[error("invalid OID prefix: {0}")]
    InvalidPrefix(String),

    #[error("corrupt corpus key: {0}")]
    Corruption(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("map error: {0}")]
    Kv(#[from] KvError),
}

pub type CorpusResult<T> = Result<T, CorpusError>;
