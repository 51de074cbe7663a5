//! JSON form of queries.
//!
//! ```json
//! {"where": {"op": "AND", "sub_queries": [
//!     {"where": {"op": "=", "key": "artist", "value": "Björk"}},
//!     {"where": {"op": ">", "key": "year", "value": "1995"}}
//! ]}, "limit": 20}
//! ```
//!
//! Values travel as strings; byte values that are not UTF-8 are rendered
//! lossily when serializing.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::predicate::{Predicate, Query};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireQuery {
    #[serde(rename = "where", default)]
    pub predicate: WirePredicate,
    #[serde(default)]
    pub limit: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePredicate {
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_queries: Vec<WireQuery>,
    /// Used when the enclosing query leaves its own limit at zero.
    #[serde(default)]
    pub limit: usize,
}

impl TryFrom<WireQuery> for Query {
    type Error = QueryError;

    fn try_from(wire: WireQuery) -> QueryResult<Self> {
        let WirePredicate {
            op,
            key,
            value,
            values,
            sub_queries,
            limit: predicate_limit,
        } = wire.predicate;

        let predicate = match op.as_str() {
            "" | "ANY" => Predicate::Any,
            "NONE" => Predicate::None,
            "=" => Predicate::eq(key, value),
            "<" => Predicate::lt(key, value),
            ">" => Predicate::gt(key, value),
            "CONTAINS" => Predicate::contains(key, value),
            "REGEXP" => Predicate::regexp(key, &value)?,
            "IN" => Predicate::one_of(key, values),
            "AND" => Predicate::And(convert_all(sub_queries)?),
            "OR" => Predicate::Or(convert_all(sub_queries)?),
            other => {
                return Err(QueryError::InvalidPredicate(format!("unknown op {other:?}")));
            }
        };

        let limit = if wire.limit == 0 {
            predicate_limit
        } else {
            wire.limit
        };
        Ok(Query { predicate, limit })
    }
}

fn convert_all(subs: Vec<WireQuery>) -> QueryResult<Vec<Query>> {
    subs.into_iter().map(Query::try_from).collect()
}

impl From<&Query> for WireQuery {
    fn from(query: &Query) -> Self {
        let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
        let mut predicate = WirePredicate {
            op: query.predicate.op().to_string(),
            key: query.predicate.key().unwrap_or_default().to_string(),
            ..WirePredicate::default()
        };
        match &query.predicate {
            Predicate::Eq { value, .. }
            | Predicate::Lt { value, .. }
            | Predicate::Gt { value, .. }
            | Predicate::Contains { value, .. } => predicate.value = text(value),
            Predicate::Regexp { regex, .. } => predicate.value = regex.as_str().to_string(),
            Predicate::In { values, .. } => {
                predicate.values = values.iter().map(|v| text(v)).collect();
            }
            Predicate::And(subs) | Predicate::Or(subs) => {
                predicate.sub_queries = subs.iter().map(WireQuery::from).collect();
            }
            Predicate::Any | Predicate::None => {}
        }
        WireQuery {
            predicate,
            limit: query.limit,
        }
    }
}
