use hoard_kv::KvError;
use hoard_query::QueryError;
use hoard_types::{Oid, TypeError};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid tag: {0}")]
    InvalidTag(#[from] TypeError),

    #[error("object {oid} has no tag {key:?}")]
    NotFound { oid: Oid, key: String },

    #[error("corrupt index entry: {0}")]
    Corruption(String),

    #[error("query error: {0}")]
    Query(QueryError),

    #[error("map error: {0}")]
    Kv(#[from] KvError),
}

pub type IndexResult<T> = Result<T, IndexError>;

impl From<QueryError> for IndexError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Corruption(msg) => Self::Corruption(msg),
            QueryError::Backend(inner) => match inner.downcast::<IndexError>() {
                Ok(index) => *index,
                Err(other) => Self::Query(QueryError::Backend(other)),
            },
            other => Self::Query(other),
        }
    }
}

impl From<IndexError> for QueryError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Corruption(msg) => Self::Corruption(msg),
            other => Self::Backend(Box::new(other)),
        }
    }
}
