use hoard_types::ObjectId;

/// BLAKE3 in key-derivation mode, one context string per object kind.
///
/// A leaf, a branch and a blob with identical bytes therefore get unrelated
/// IDs, and none of them collides with the plain BLAKE3 [`Oid`] of the same
/// bytes.
///
/// [`Oid`]: hoard_types::Oid
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    context: &'static str,
}

impl ContentHasher {
    pub const LEAF: Self = Self::new("hoard 2024 map leaf node");
    pub const BRANCH: Self = Self::new("hoard 2024 map branch node");
    pub const BLOB: Self = Self::new("hoard 2024 out-of-line value");

    pub const fn new(context: &'static str) -> Self {
        Self { context }
    }

    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new_derive_key(self.context);
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_separate_ids() {
        let data = b"same content";
        let ids = [
            ContentHasher::LEAF.hash(data),
            ContentHasher::BRANCH.hash(data),
            ContentHasher::BLOB.hash(data),
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        assert_ne!(ids[1], ids[2]);
        assert_eq!(ContentHasher::LEAF.hash(data), ids[0]);
    }

    #[test]
    fn matches_blake3_derive_key() {
        let expected = blake3::derive_key("hoard 2024 out-of-line value", b"payload");
        assert_eq!(ContentHasher::BLOB.hash(b"payload").as_bytes(), &expected);
    }

    #[test]
    fn differs_from_object_fingerprint() {
        let oid = hoard_types::Oid::hash(b"data");
        assert_ne!(ContentHasher::BLOB.hash(b"data").as_bytes(), oid.as_bytes());
    }
}
