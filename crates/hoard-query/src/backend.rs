use std::ops::ControlFlow;

use hoard_kv::Span;
use hoard_types::Oid;

use crate::error::QueryResult;

/// Callback receiving `(oid, tag key, tag value)` for each visited entry.
pub type ScanFn<'a> = dyn FnMut(Oid, &[u8], &[u8]) -> ControlFlow<()> + 'a;

/// Read access to a tag index, as needed by the query engine.
///
/// Spans are relative to the entry namespace: the backend adds its own
/// physical prefix. Malformed entries must be reported as
/// [`QueryError::Corruption`](crate::QueryError::Corruption), which aborts
/// the query.
pub trait QueryBackend {
    /// Scan forward entries (`oid ∥ key`) in ascending order.
    fn scan(&self, span: &Span, f: &mut ScanFn<'_>) -> QueryResult<()>;

    /// Scan inverse entries (`key ∥ 0 ∥ value ∥ 0 ∥ oid`) in ascending order.
    fn scan_inverted(&self, span: &Span, f: &mut ScanFn<'_>) -> QueryResult<()>;

    /// Value of tag `key` on `oid`, if set.
    fn get_value(&self, oid: &Oid, key: &str) -> QueryResult<Option<Vec<u8>>>;
}
