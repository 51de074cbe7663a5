use regex::bytes::Regex;

use crate::error::{QueryError, QueryResult};
use crate::wire::WireQuery;

/// One node of a query tree.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// Every tagged object.
    Any,
    /// Nothing.
    None,
    Eq { key: String, value: Vec<u8> },
    Lt { key: String, value: Vec<u8> },
    Gt { key: String, value: Vec<u8> },
    /// Value contains `value` as a byte substring.
    Contains { key: String, value: Vec<u8> },
    Regexp { key: String, regex: Regex },
    In { key: String, values: Vec<Vec<u8>> },
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Predicate {
    pub fn eq(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn lt(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Lt {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn gt(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Gt {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn contains(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Contains {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn regexp(key: impl Into<String>, pattern: &str) -> QueryResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| QueryError::InvalidPredicate(format!("bad regexp {pattern:?}: {e}")))?;
        Ok(Self::Regexp {
            key: key.into(),
            regex,
        })
    }

    pub fn one_of<V: Into<Vec<u8>>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(subs: impl IntoIterator<Item = Query>) -> Self {
        Self::And(subs.into_iter().collect())
    }

    pub fn or(subs: impl IntoIterator<Item = Query>) -> Self {
        Self::Or(subs.into_iter().collect())
    }

    /// Operator name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::None => "NONE",
            Self::Eq { .. } => "=",
            Self::Lt { .. } => "<",
            Self::Gt { .. } => ">",
            Self::Contains { .. } => "CONTAINS",
            Self::Regexp { .. } => "REGEXP",
            Self::In { .. } => "IN",
            Self::And(_) => "AND",
            Self::Or(_) => "OR",
        }
    }

    /// Tag key a comparison predicate tests.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Eq { key, .. }
            | Self::Lt { key, .. }
            | Self::Gt { key, .. }
            | Self::Contains { key, .. }
            | Self::Regexp { key, .. }
            | Self::In { key, .. } => Some(key),
            Self::Any | Self::None | Self::And(_) | Self::Or(_) => None,
        }
    }
}

/// A predicate with a result cap. A `limit` of zero inherits the parent's
/// cap, or the configured default at the top level.
#[derive(Clone, Debug)]
pub struct Query {
    pub predicate: Predicate,
    pub limit: usize,
}

impl Query {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            limit: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn from_json(json: &str) -> QueryResult<Self> {
        let wire: WireQuery = serde_json::from_str(json)?;
        Self::try_from(wire)
    }

    pub fn to_json(&self) -> QueryResult<String> {
        Ok(serde_json::to_string(&WireQuery::from(self))?)
    }
}

impl From<Predicate> for Query {
    fn from(predicate: Predicate) -> Self {
        Self::new(predicate)
    }
}
