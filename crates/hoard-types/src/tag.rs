use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Field separator in the physical index encoding. Neither tag keys nor tag
/// values may contain it.
pub const SEPARATOR: u8 = 0x00;

/// A metadata fact: a string key and a byte-string value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: Vec<u8>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Reject tags whose key or value contains [`SEPARATOR`].
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.key.as_bytes().contains(&SEPARATOR) {
            return Err(TypeError::ReservedByte {
                field: "key",
                tag: self.to_string(),
            });
        }
        if self.value.contains(&SEPARATOR) {
            return Err(TypeError::ReservedByte {
                field: "value",
                tag: self.to_string(),
            });
        }
        Ok(())
    }

    /// The value as UTF-8, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key.escape_debug(), self.value.escape_ascii())
    }
}

/// Tags keyed by tag key. At most one value per key; later inserts win.
pub type TagSet = BTreeMap<String, Vec<u8>>;
