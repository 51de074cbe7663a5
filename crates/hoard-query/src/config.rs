use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Result cap applied when a query leaves its limit at zero.
    pub default_limit: usize,
    /// Deepest allowed nesting of `AND`/`OR` predicates.
    pub max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_depth: 32,
        }
    }
}
