use std::ops::ControlFlow;

use hoard_kv::{Kv, Root, Span};
use hoard_types::{Oid, OID_LEN};
use tracing::debug;

use crate::error::{CorpusError, CorpusResult};

/// Content-addressed object map.
#[derive(Clone)]
pub struct Corpus {
    kv: Kv,
    max_data_size: usize,
}

impl Corpus {
    pub const DEFAULT_MAX_DATA_SIZE: usize = 64 << 20;

    pub fn new(kv: Kv, max_data_size: usize) -> Self {
        Self { kv, max_data_size }
    }

    pub fn max_data_size(&self) -> usize {
        self.max_data_size
    }

    pub fn new_empty(&self) -> CorpusResult<Root> {
        Ok(self.kv.new_empty()?)
    }

    /// Store `data` and return its OID with the new root.
    ///
    /// Posting bytes that are already present returns the input root.
    pub fn post(&self, root: &Root, data: &[u8]) -> CorpusResult<(Oid, Root)> {
        if data.len() > self.max_data_size {
            return Err(CorpusError::TooLarge {
                size: data.len(),
                max: self.max_data_size,
            });
        }

        let oid = Oid::hash(data);
        if self.kv.get(root, oid.as_bytes())?.is_some() {
            debug!(oid = %oid.short_hex(), "object already present");
            return Ok((oid, *root));
        }

        let root = self.kv.put(root, oid.as_bytes(), data)?;
        debug!(oid = %oid.short_hex(), size = data.len(), "object posted");
        Ok((oid, root))
    }

    pub fn get(&self, root: &Root, oid: &Oid) -> CorpusResult<Vec<u8>> {
        self.kv
            .get(root, oid.as_bytes())?
            .ok_or(CorpusError::NotFound(*oid))
    }

    pub fn contains(&self, root: &Root, oid: &Oid) -> CorpusResult<bool> {
        Ok(self.kv.get(root, oid.as_bytes())?.is_some())
    }

    /// Visit stored objects whose OID bytes fall in `span`, in ascending
    /// OID order.
    pub fn for_each<F, E>(&self, root: &Root, span: &Span, mut f: F) -> Result<(), E>
    where
        F: FnMut(Oid, &[u8]) -> Result<ControlFlow<()>, E>,
        E: From<CorpusError>,
    {
        let mut failure = None;
        self.kv
            .for_each(root, span, |key, value| -> CorpusResult<ControlFlow<()>> {
                let oid = Oid::from_slice(key)
                    .map_err(|e| CorpusError::Corruption(e.to_string()))?;
                match f(oid, value) {
                    Ok(flow) => Ok(flow),
                    Err(e) => {
                        failure = Some(e);
                        Ok(ControlFlow::Break(()))
                    }
                }
            })
            .map_err(E::from)?;
        failure.map_or(Ok(()), Err)
    }

    pub fn list_ids(&self, root: &Root, span: &Span) -> CorpusResult<Vec<Oid>> {
        let mut ids = Vec::new();
        self.for_each(root, span, |oid, _| {
            ids.push(oid);
            Ok::<_, CorpusError>(ControlFlow::Continue(()))
        })?;
        Ok(ids)
    }

    /// Find the single stored OID whose hex form starts with `prefix`.
    pub fn resolve_prefix(&self, root: &Root, prefix: &str) -> CorpusResult<Oid> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.is_empty() || prefix.len() > OID_LEN * 2 {
            return Err(CorpusError::InvalidPrefix(prefix));
        }
        let whole = prefix.len() / 2 * 2;
        let bytes = hex::decode(&prefix[..whole])
            .map_err(|e| CorpusError::InvalidPrefix(format!("{prefix}: {e}")))?;
        if !prefix[whole..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CorpusError::InvalidPrefix(prefix));
        }

        let mut matches = Vec::new();
        self.for_each(root, &Span::prefix(&bytes), |oid, _| {
            if oid.to_hex().starts_with(&prefix) {
                matches.push(oid);
            }
            Ok::<_, CorpusError>(ControlFlow::Continue(()))
        })?;

        match matches.as_slice() {
            [] => Err(CorpusError::NoMatch(prefix)),
            [oid] => Ok(*oid),
            _ => Err(CorpusError::Ambiguous {
                prefix,
                count: matches.len(),
            }),
        }
    }

    /// Objects cannot be removed from a corpus.
    pub fn delete(&self, _root: &Root, _oid: &Oid) -> CorpusResult<Root> {
        Err(CorpusError::Unsupported("corpus delete"))
    }
}
