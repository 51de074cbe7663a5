use hoard_kv::{Root, Span};
use hoard_query::backend::ScanFn;
use hoard_query::{QueryBackend, QueryResult};
use hoard_types::Oid;

use crate::error::IndexResult;
use crate::index::TagIndex;
use crate::keys;

/// Query engine view of one index snapshot.
pub struct IndexBackend<'a> {
    index: &'a TagIndex,
    root: Root,
}

impl<'a> IndexBackend<'a> {
    pub(crate) fn new(index: &'a TagIndex, root: Root) -> Self {
        Self { index, root }
    }
}

impl QueryBackend for IndexBackend<'_> {
    fn scan(&self, span: &Span, f: &mut ScanFn<'_>) -> QueryResult<()> {
        let span = span.with_prefix(keys::FORWARD);
        self.index
            .scan(&self.root, &span, |raw, value| -> IndexResult<_> {
                let (oid, key) = keys::parse_forward(raw)?;
                Ok(f(oid, key.as_bytes(), value))
            })
            .map_err(Into::into)
    }

    fn scan_inverted(&self, span: &Span, f: &mut ScanFn<'_>) -> QueryResult<()> {
        let span = span.with_prefix(keys::INVERSE);
        self.index
            .scan(&self.root, &span, |raw, stored| -> IndexResult<_> {
                let (key, value, oid) = keys::parse_inverse(raw, stored)?;
                Ok(f(oid, key.as_bytes(), value))
            })
            .map_err(Into::into)
    }

    fn get_value(&self, oid: &Oid, key: &str) -> QueryResult<Option<Vec<u8>>> {
        self.index
            .lookup(&self.root, oid, key)
            .map_err(Into::into)
    }
}
