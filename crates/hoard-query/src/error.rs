use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("query nesting exceeds maximum depth of {max}")]
    TooDeep { max: usize },

    /// The backend met an index entry it could not decode.
    #[error("corrupt index entry: {0}")]
    Corruption(String),

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("query json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type QueryResult<T> = Result<T, QueryError>;
