use hoard_cell::CellError;
use hoard_corpus::CorpusError;
use hoard_index::IndexError;
use hoard_kv::KvError;
use hoard_query::QueryError;
use hoard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoardError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Reserved separator byte in a tag, oversized payload, malformed
    /// OID prefix.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("corruption: {0}")]
    Corruption(String),

    /// The retry budget ran out while other writers kept winning.
    #[error("state update conflicted {attempts} times")]
    Conflict { attempts: u32 },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("prefix {prefix} is ambiguous ({count} matches)")]
    Ambiguous { prefix: String, count: usize },

    #[error("map error: {0}")]
    Kv(#[from] KvError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("query error: {0}")]
    Query(QueryError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned")]
    Poisoned,
}

pub type HoardResult<T> = Result<T, HoardError>;

impl From<CorpusError> for HoardError {
    fn from(e: CorpusError) -> Self {
        match e {
            CorpusError::NotFound(oid) => Self::NotFound(format!("object {oid}")),
            CorpusError::NoMatch(prefix) => Self::NotFound(format!("no object matches {prefix}")),
            e @ (CorpusError::TooLarge { .. } | CorpusError::InvalidPrefix(_)) => {
                Self::InvalidArgument(e.to_string())
            }
            CorpusError::Ambiguous { prefix, count } => Self::Ambiguous { prefix, count },
            CorpusError::Corruption(msg) => Self::Corruption(msg),
            CorpusError::Unsupported(op) => Self::Unsupported(op),
            CorpusError::Kv(e) => Self::Kv(e),
        }
    }
}

impl From<IndexError> for HoardError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::InvalidTag(e) => Self::InvalidArgument(e.to_string()),
            IndexError::NotFound { oid, key } => {
                Self::NotFound(format!("tag {key:?} on object {oid}"))
            }
            IndexError::Corruption(msg) => Self::Corruption(msg),
            IndexError::Query(e) => e.into(),
            IndexError::Kv(e) => Self::Kv(e),
        }
    }
}

impl From<QueryError> for HoardError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidPredicate(msg) => Self::InvalidPredicate(msg),
            e @ (QueryError::TooDeep { .. } | QueryError::Json(_)) => {
                Self::InvalidPredicate(e.to_string())
            }
            QueryError::Corruption(msg) => Self::Corruption(msg),
            other => Self::Query(other),
        }
    }
}

impl From<CellError> for HoardError {
    fn from(e: CellError) -> Self {
        match e {
            e @ CellError::TooLarge { .. } => Self::InvalidArgument(e.to_string()),
            CellError::Corruption(msg) => Self::Corruption(msg),
            CellError::Conflict { attempts } => Self::Conflict { attempts },
            CellError::Serialization(e) => Self::Serialization(e.to_string()),
            CellError::Io(e) => Self::Io(e),
            CellError::Poisoned => Self::Poisoned,
        }
    }
}
