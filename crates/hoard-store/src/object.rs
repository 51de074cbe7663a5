use std::fmt;

use hoard_types::ObjectId;

use crate::hasher::ContentHasher;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Sorted key/value entries at the bottom of a map.
    Leaf,
    /// Sorted child references.
    Branch,
    /// One map value kept outside its leaf.
    Blob,
}

impl ObjectKind {
    const ALL: [Self; 3] = [Self::Leaf, Self::Branch, Self::Blob];

    pub fn hasher(self) -> ContentHasher {
        match self {
            Self::Leaf => ContentHasher::LEAF,
            Self::Branch => ContentHasher::BRANCH,
            Self::Blob => ContentHasher::BLOB,
        }
    }

    /// Tag byte written in front of the data by on-disk backends.
    pub fn code(self) -> u8 {
        match self {
            Self::Leaf => b'l',
            Self::Branch => b'b',
            Self::Blob => b'v',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Leaf => "leaf",
            Self::Branch => "branch",
            Self::Blob => "blob",
        })
    }
}

/// Opaque bytes tagged with their kind. Stores hash them but never parse
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_code() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ObjectKind::from_code(0), None);
    }

    #[test]
    fn kind_is_part_of_the_id() {
        let leaf = StoredObject::new(ObjectKind::Leaf, b"bytes".to_vec());
        let blob = StoredObject::new(ObjectKind::Blob, b"bytes".to_vec());
        assert_ne!(leaf.compute_id(), blob.compute_id());
        assert_eq!(blob.compute_id(), ContentHasher::BLOB.hash(b"bytes"));
    }

    #[test]
    fn kinds_display_lowercase() {
        let names: Vec<String> = ObjectKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["leaf", "branch", "blob"]);
    }
}
