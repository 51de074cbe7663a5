//! On-store node layout. Nodes are bincode-encoded and written as
//! `Leaf` or `Branch` objects; the object kind says which one to decode.

use hoard_store::{ObjectKind, StoredObject};
use hoard_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{KvError, KvResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Value {
    Inline(Vec<u8>),
    /// Stored as a separate `Blob` object.
    External { id: ObjectId, len: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LeafEntry {
    pub key: Vec<u8>,
    pub value: Value,
}

/// Reference from a branch to a child subtree. `first_key` is the smallest
/// key stored anywhere below the child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChildRef {
    pub first_key: Vec<u8>,
    pub id: ObjectId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LeafNode {
    pub entries: Vec<LeafEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BranchNode {
    pub children: Vec<ChildRef>,
}

pub(crate) enum Node {
    Leaf(LeafNode),
    Branch(BranchNode),
}

impl Node {
    pub fn decode(id: &ObjectId, object: &StoredObject) -> KvResult<Self> {
        let decode_err = |e: bincode::Error| KvError::Decode {
            id: *id,
            reason: e.to_string(),
        };
        match object.kind {
            ObjectKind::Leaf => bincode::deserialize(&object.data)
                .map(Node::Leaf)
                .map_err(decode_err),
            ObjectKind::Branch => bincode::deserialize(&object.data)
                .map(Node::Branch)
                .map_err(decode_err),
            ObjectKind::Blob => Err(KvError::UnexpectedKind {
                id: *id,
                expected: ObjectKind::Leaf,
                found: ObjectKind::Blob,
            }),
        }
    }
}

impl LeafNode {
    pub fn encode(&self) -> KvResult<StoredObject> {
        let data = bincode::serialize(self).map_err(|e| KvError::Encode(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Leaf, data))
    }
}

impl BranchNode {
    pub fn encode(&self) -> KvResult<StoredObject> {
        let data = bincode::serialize(self).map_err(|e| KvError::Encode(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Branch, data))
    }

    /// Index of the child whose key range holds `key`.
    pub fn child_for(&self, key: &[u8]) -> usize {
        self.children
            .partition_point(|c| c.first_key.as_slice() <= key)
            .saturating_sub(1)
    }
}
