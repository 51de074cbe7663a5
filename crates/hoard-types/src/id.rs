//! 256-bit hash identifiers.
//!
//! [`Oid`] and [`ObjectId`] share a representation but live in different
//! namespaces: an `Oid` names archived content and is the join key between
//! the corpus and the tag index, while an `ObjectId` names the storage
//! objects (tree nodes, out-of-line values) that make up a snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Byte length of every hash identifier.
pub const OID_LEN: usize = 32;

macro_rules! hash_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name([u8; OID_LEN]);

        impl $name {
            /// Wrap a pre-computed hash.
            pub const fn from_hash(hash: [u8; OID_LEN]) -> Self {
                Self(hash)
            }

            /// Parse from a byte slice that must be exactly 32 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
                let arr: [u8; OID_LEN] =
                    bytes.try_into().map_err(|_| TypeError::InvalidLength {
                        expected: OID_LEN,
                        actual: bytes.len(),
                    })?;
                Ok(Self(arr))
            }

            /// The raw 32-byte hash.
            pub fn as_bytes(&self) -> &[u8; OID_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// First four bytes as hex, for log lines.
            pub fn short_hex(&self) -> String {
                hex::encode(&self.0[..4])
            }

            /// Parse from a full-length hex string.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
                Self::from_slice(&bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl From<[u8; OID_LEN]> for $name {
            fn from(bytes: [u8; OID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash_id! {
    /// Fingerprint of an archived object.
    ///
    /// An `Oid` is the plain BLAKE3 hash of the object's raw bytes, so the
    /// same bytes always produce the same `Oid` no matter which snapshot
    /// they are posted into.
    Oid
}

hash_id! {
    /// Content address of an internal storage object.
    ///
    /// Unlike [`Oid`], an `ObjectId` is produced by a domain-separated
    /// hasher in `hoard-store`, so a tree node never collides with archived
    /// content that happens to share its bytes.
    ObjectId
}

impl Oid {
    /// Fingerprint raw bytes.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_oid() {
        assert_eq!(Oid::hash(b"hello"), Oid::hash(b"hello"));
        assert_ne!(Oid::hash(b"hello"), Oid::hash(b"world"));
    }

    #[test]
    fn hash_matches_plain_blake3() {
        let expected = *blake3::hash(b"hello").as_bytes();
        assert_eq!(Oid::hash(b"hello").as_bytes(), &expected);
    }

    #[test]
    fn hex_roundtrip() {
        let oid = Oid::hash(b"test");
        assert_eq!(Oid::from_hex(&oid.to_hex()).unwrap(), oid);
        assert_eq!(oid.short_hex().len(), 8);
        assert_eq!(format!("{oid}").len(), 64);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = Oid::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 3
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn debug_names_the_type() {
        let oid = Oid::from_hash([0xab; 32]);
        assert_eq!(format!("{oid:?}"), "Oid(abababab)");
        let id = ObjectId::from_hash([0xcd; 32]);
        assert_eq!(format!("{id:?}"), "ObjectId(cdcdcdcd)");
    }

    #[test]
    fn ordering_is_bytewise() {
        assert!(Oid::from_hash([0; 32]) < Oid::from_hash([1; 32]));
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::from_hash([7; 32]);
        let back: ObjectId = serde_json::from_value(serde_json::to_value(id).unwrap()).unwrap();
        assert_eq!(back, id);
    }
}
