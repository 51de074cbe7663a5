use serde::{Deserialize, Serialize};

/// Shape parameters for persistent map nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    /// Maximum entries per leaf before it is split.
    pub max_leaf_entries: usize,
    /// Maximum children per branch before it is split.
    pub max_branch_children: usize,
    /// Values longer than this many bytes are stored as separate blobs.
    pub inline_threshold: usize,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            max_leaf_entries: 64,
            max_branch_children: 64,
            inline_threshold: 1024,
        }
    }
}

impl KvConfig {
    pub(crate) fn leaf_fanout(&self) -> usize {
        self.max_leaf_entries.max(2)
    }

    pub(crate) fn branch_fanout(&self) -> usize {
        self.max_branch_children.max(2)
    }
}
