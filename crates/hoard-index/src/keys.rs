//! Physical key layout.

use hoard_types::{Oid, OID_LEN, SEPARATOR};

use crate::error::{IndexError, IndexResult};

pub(crate) const FORWARD: &[u8] = &[b'f', SEPARATOR];
pub(crate) const INVERSE: &[u8] = &[b'i', SEPARATOR];

pub(crate) fn forward_prefix(oid: &Oid) -> Vec<u8> {
    [FORWARD, oid.as_bytes().as_slice()].concat()
}

pub(crate) fn forward_key(oid: &Oid, key: &str) -> Vec<u8> {
    [FORWARD, oid.as_bytes().as_slice(), key.as_bytes()].concat()
}

/// Prefix shared by all inverse entries of one tag key.
pub(crate) fn inverse_key_prefix(key: &str) -> Vec<u8> {
    [INVERSE, key.as_bytes(), &[SEPARATOR]].concat()
}

pub(crate) fn inverse_key(key: &str, value: &[u8], oid: &Oid) -> Vec<u8> {
    [
        INVERSE,
        key.as_bytes(),
        &[SEPARATOR],
        value,
        &[SEPARATOR],
        oid.as_bytes().as_slice(),
    ]
    .concat()
}

/// Split a forward key into `(oid, tag key)`.
pub(crate) fn parse_forward(raw: &[u8]) -> IndexResult<(Oid, &str)> {
    let body = raw
        .strip_prefix(FORWARD)
        .ok_or_else(|| corrupt("forward", raw))?;
    if body.len() < OID_LEN {
        return Err(corrupt("forward", raw));
    }
    let (oid, key) = body.split_at(OID_LEN);
    let oid = Oid::from_slice(oid).map_err(|_| corrupt("forward", raw))?;
    let key = std::str::from_utf8(key).map_err(|_| corrupt("forward", raw))?;
    Ok((oid, key))
}

/// Split an inverse entry into `(tag key, value, oid)`, checking that the
/// stored value repeats the OID from the key.
pub(crate) fn parse_inverse<'a>(raw: &'a [u8], stored: &[u8]) -> IndexResult<(&'a str, &'a [u8], Oid)> {
    let body = raw
        .strip_prefix(INVERSE)
        .ok_or_else(|| corrupt("inverse", raw))?;
    // The OID may itself contain separator bytes, so split at most twice.
    let mut parts = body.splitn(3, |b| *b == SEPARATOR);
    let (Some(key), Some(value), Some(oid)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(corrupt("inverse", raw));
    };
    if oid.len() != OID_LEN || oid != stored {
        return Err(corrupt("inverse", raw));
    }
    let oid = Oid::from_slice(oid).map_err(|_| corrupt("inverse", raw))?;
    let key = std::str::from_utf8(key).map_err(|_| corrupt("inverse", raw))?;
    Ok((key, value, oid))
}

fn corrupt(kind: &str, raw: &[u8]) -> IndexError {
    IndexError::Corruption(format!("malformed {kind} key {}", raw.escape_ascii()))
}
