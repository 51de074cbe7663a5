use std::collections::BTreeMap;
use std::ops::ControlFlow;

use hoard_kv::{Kv, Mutation, Root, Span};
use hoard_query::{execute, Query, QueryConfig, ResultSet};
use hoard_types::{Oid, Tag};
use tracing::debug;

use crate::backend::IndexBackend;
use crate::error::{IndexError, IndexResult};
use crate::keys;

/// Operator over tag index snapshots.
///
/// Like the map it sits on, a `TagIndex` holds no snapshot state: every
/// call names the [`Root`] it reads or derives from.
#[derive(Clone)]
pub struct TagIndex {
    kv: Kv,
    query: QueryConfig,
}

impl TagIndex {
    pub fn new(kv: Kv, query: QueryConfig) -> Self {
        Self { kv, query }
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query
    }

    pub fn new_empty(&self) -> IndexResult<Root> {
        Ok(self.kv.new_empty()?)
    }

    /// Record `tags` on `oid` and return the new root.
    ///
    /// Every tag is validated before anything is written, so a single bad
    /// tag leaves the index untouched. When a key repeats, the last value
    /// wins. Setting a key that already has a different value replaces the
    /// forward entry and removes the old inverse entry. All entries go to
    /// the map as one sorted batch.
    pub fn add_tags(&self, root: &Root, oid: &Oid, tags: &[Tag]) -> IndexResult<Root> {
        for tag in tags {
            tag.validate()?;
        }

        let latest: BTreeMap<&str, &[u8]> = tags
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_slice()))
            .collect();

        // key -> Some(value) to write, None to delete
        let mut changes: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for (key, value) in latest {
            let forward = keys::forward_key(oid, key);
            if let Some(old) = self.kv.get(root, &forward)? {
                if old == value {
                    continue;
                }
                changes.insert(keys::inverse_key(key, &old, oid), None);
            }
            changes.insert(forward, Some(value.to_vec()));
            changes.insert(
                keys::inverse_key(key, value, oid),
                Some(oid.as_bytes().to_vec()),
            );
        }

        if changes.is_empty() {
            return Ok(*root);
        }
        let mutations: Vec<Mutation> = changes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Mutation::put(key, value),
                None => Mutation::delete(&key),
            })
            .collect();

        let new_root = self.kv.mutate(root, &mutations)?;
        debug!(
            oid = %oid.short_hex(),
            tags = tags.len(),
            mutations = mutations.len(),
            "tags added"
        );
        Ok(new_root)
    }

    /// All tags on `oid`, ordered by key.
    pub fn get_tags(&self, root: &Root, oid: &Oid) -> IndexResult<Vec<Tag>> {
        let mut tags = Vec::new();
        let span = Span::prefix(&keys::forward_prefix(oid));
        self.scan(root, &span, |raw, value| -> IndexResult<_> {
            let (_, key) = keys::parse_forward(raw)?;
            tags.push(Tag::new(key, value));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(tags)
    }

    pub fn get_tag_value(&self, root: &Root, oid: &Oid, key: &str) -> IndexResult<Vec<u8>> {
        self.lookup(root, oid, key)?
            .ok_or_else(|| IndexError::NotFound {
                oid: *oid,
                key: key.to_string(),
            })
    }

    pub(crate) fn lookup(&self, root: &Root, oid: &Oid, key: &str) -> IndexResult<Option<Vec<u8>>> {
        Ok(self.kv.get(root, &keys::forward_key(oid, key))?)
    }

    /// Visit every tagged object with its full tag list, in OID order.
    pub fn for_each<F, E>(&self, root: &Root, mut f: F) -> Result<(), E>
    where
        F: FnMut(Oid, Vec<Tag>) -> Result<ControlFlow<()>, E>,
        E: From<IndexError>,
    {
        // Forward entries sort by OID first, so a change of OID closes a group.
        let mut group: Option<(Oid, Vec<Tag>)> = None;
        self.scan(root, &Span::prefix(keys::FORWARD), |raw, value| -> Result<_, E> {
            let (oid, key) = keys::parse_forward(raw)?;
            let tag = Tag::new(key, value);
            if let Some((current, tags)) = group.as_mut() {
                if *current == oid {
                    tags.push(tag);
                    return Ok(ControlFlow::Continue(()));
                }
            }
            match group.replace((oid, vec![tag])) {
                Some((done, tags)) => {
                    let flow = f(done, tags)?;
                    if flow.is_break() {
                        group = None;
                    }
                    Ok(flow)
                }
                None => Ok(ControlFlow::Continue(())),
            }
        })?;

        if let Some((oid, tags)) = group {
            f(oid, tags)?;
        }
        Ok(())
    }

    /// Visit each distinct tag key once, in ascending order.
    pub fn for_each_tag_key<F, E>(&self, root: &Root, mut f: F) -> Result<(), E>
    where
        F: FnMut(&str) -> Result<ControlFlow<()>, E>,
        E: From<IndexError>,
    {
        let mut previous: Option<String> = None;
        self.scan(root, &Span::prefix(keys::INVERSE), |raw, stored| -> Result<_, E> {
            let (key, _, _) = keys::parse_inverse(raw, stored)?;
            if previous.as_deref() == Some(key) {
                return Ok(ControlFlow::Continue(()));
            }
            previous = Some(key.to_string());
            f(key)
        })
    }

    /// Visit each distinct value of tag `key` once, in ascending order.
    pub fn for_each_tag_value<F, E>(&self, root: &Root, key: &str, mut f: F) -> Result<(), E>
    where
        F: FnMut(&[u8]) -> Result<ControlFlow<()>, E>,
        E: From<IndexError>,
    {
        let mut previous: Option<Vec<u8>> = None;
        let span = Span::prefix(&keys::inverse_key_prefix(key));
        self.scan(root, &span, |raw, stored| -> Result<_, E> {
            let (_, value, _) = keys::parse_inverse(raw, stored)?;
            if previous.as_deref() == Some(value) {
                return Ok(ControlFlow::Continue(()));
            }
            previous = Some(value.to_vec());
            f(value)
        })
    }

    pub fn search(&self, root: &Root, query: &Query) -> IndexResult<ResultSet> {
        Ok(execute(&self.backend(*root), query, &self.query)?)
    }

    /// Query engine view of `root`.
    pub fn backend(&self, root: Root) -> IndexBackend<'_> {
        IndexBackend::new(self, root)
    }

    /// Raw scan over the physical key space. Errors from `visit` stop the
    /// scan and are returned unchanged.
    pub(crate) fn scan<F, E>(&self, root: &Root, span: &Span, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, E>,
        E: From<IndexError>,
    {
        let mut failure = None;
        self.kv
            .for_each(root, span, |raw, value| -> IndexResult<_> {
                match visit(raw, value) {
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
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use hoard_kv::{Entry, KvConfig};
    use hoard_query::{Predicate, QueryError};
    use hoard_store::InMemoryObjectStore;
    use proptest::prelude::*;

    use super::*;

    struct Fixture {
        store: Arc<InMemoryObjectStore>,
        kv: Kv,
        index: TagIndex,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryObjectStore::new());
        let kv = Kv::new(
            store.clone(),
            KvConfig {
                max_leaf_entries: 6,
                max_branch_children: 4,
                inline_threshold: 32,
            },
        );
        let index = TagIndex::new(kv.clone(), QueryConfig::default());
        Fixture { store, kv, index }
    }

    fn oid(n: u8) -> Oid {
        Oid::from_hash([n; 32])
    }

    fn tag(key: &str, value: &str) -> Tag {
        Tag::new(key, value)
    }

    fn collect<T: Ord>(f: impl FnOnce(&mut BTreeSet<T>)) -> BTreeSet<T> {
        let mut out = BTreeSet::new();
        f(&mut out);
        out
    }

    // ---- add / get ----

    #[test]
    fn tags_roundtrip() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx
            .index
            .add_tags(&root, &oid(1), &[tag("title", "Hyperballad"), tag("artist", "Björk")])
            .unwrap();
        assert_eq!(
            fx.index.get_tags(&root, &oid(1)).unwrap(),
            vec![tag("artist", "Björk"), tag("title", "Hyperballad")]
        );
        assert!(fx.index.get_tags(&root, &oid(2)).unwrap().is_empty());
    }

    #[test]
    fn last_value_wins_within_call() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx
            .index
            .add_tags(&root, &oid(1), &[tag("k", "first"), tag("k", "second")])
            .unwrap();
        assert_eq!(fx.index.get_tags(&root, &oid(1)).unwrap(), vec![tag("k", "second")]);
        assert_eq!(
            fx.index.get_tag_value(&root, &oid(1), "k").unwrap(),
            b"second"
        );
    }

    #[test]
    fn reserved_byte_rejected_without_writes() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let before = fx.store.stats().objects;
        for bad in [tag("ok", "bad\0value"), tag("bad\0key", "ok")] {
            let result = fx.index.add_tags(&root, &oid(1), &[tag("fine", "x"), bad]);
            assert!(matches!(result, Err(IndexError::InvalidTag(_))));
        }
        assert_eq!(fx.store.stats().objects, before);
        assert!(fx.index.get_tags(&root, &oid(1)).unwrap().is_empty());
    }

    #[test]
    fn overwrite_removes_stale_inverse_entry() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx.index.add_tags(&root, &oid(1), &[tag("year", "1995")]).unwrap();
        let root = fx.index.add_tags(&root, &oid(1), &[tag("year", "1996")]).unwrap();

        let old = fx
            .index
            .search(&root, &Query::new(Predicate::eq("year", "1995")))
            .unwrap();
        assert!(old.is_empty());
        let new = fx
            .index
            .search(&root, &Query::new(Predicate::eq("year", "1996")))
            .unwrap();
        assert_eq!(new.ids, vec![oid(1)]);
    }

    #[test]
    fn adding_existing_tags_keeps_root() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let tags = [tag("a", "1"), tag("b", "2")];
        let root = fx.index.add_tags(&root, &oid(1), &tags).unwrap();
        assert_eq!(fx.index.add_tags(&root, &oid(1), &tags).unwrap(), root);
        assert_eq!(fx.index.add_tags(&root, &oid(1), &[]).unwrap(), root);
    }

    #[test]
    fn missing_tag_value_not_found() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx.index.add_tags(&root, &oid(1), &[tag("a", "1")]).unwrap();
        assert!(matches!(
            fx.index.get_tag_value(&root, &oid(1), "b"),
            Err(IndexError::NotFound { key, .. }) if key == "b"
        ));
    }

    #[test]
    fn empty_values_allowed() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx.index.add_tags(&root, &oid(1), &[tag("flag", "")]).unwrap();
        assert_eq!(fx.index.get_tag_value(&root, &oid(1), "flag").unwrap(), b"");
        let rs = fx
            .index
            .search(&root, &Query::new(Predicate::eq("flag", "")))
            .unwrap();
        assert_eq!(rs.ids, vec![oid(1)]);
    }

    // ---- iteration ----

    fn sample(fx: &Fixture) -> Root {
        let mut root = fx.index.new_empty().unwrap();
        let rows: [(u8, &[(&str, &str)]); 3] = [
            (1, &[("artist", "Björk"), ("genre", "electronic")]),
            (2, &[("artist", "Portishead"), ("genre", "trip-hop")]),
            (3, &[("artist", "Björk"), ("year", "1997")]),
        ];
        for (n, tags) in rows {
            let tags: Vec<Tag> = tags.iter().map(|(k, v)| tag(k, v)).collect();
            root = fx.index.add_tags(&root, &oid(n), &tags).unwrap();
        }
        root
    }

    #[test]
    fn for_each_groups_by_object() {
        let fx = fixture();
        let root = sample(&fx);
        let mut seen = Vec::new();
        fx.index
            .for_each(&root, |oid, tags| {
                seen.push((oid, tags.len()));
                Ok::<_, IndexError>(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(seen, vec![(oid(1), 2), (oid(2), 2), (oid(3), 2)]);
    }

    #[test]
    fn for_each_stops_on_break() {
        let fx = fixture();
        let root = sample(&fx);
        let mut seen = Vec::new();
        fx.index
            .for_each(&root, |oid, _| {
                seen.push(oid);
                Ok::<_, IndexError>(ControlFlow::Break(()))
            })
            .unwrap();
        assert_eq!(seen, vec![oid(1)]);
    }

    #[test]
    fn tag_keys_are_distinct() {
        let fx = fixture();
        let root = sample(&fx);
        let mut keys = Vec::new();
        fx.index
            .for_each_tag_key(&root, |key| {
                keys.push(key.to_string());
                Ok::<_, IndexError>(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(keys, vec!["artist", "genre", "year"]);
    }

    #[test]
    fn tag_values_are_distinct() {
        let fx = fixture();
        let root = sample(&fx);
        let mut values = Vec::new();
        fx.index
            .for_each_tag_value(&root, "artist", |value| {
                values.push(String::from_utf8_lossy(value).into_owned());
                Ok::<_, IndexError>(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(values, vec!["Björk", "Portishead"]);
    }

    #[test]
    fn tag_values_of_prefix_key_do_not_leak() {
        let fx = fixture();
        let root = fx.index.new_empty().unwrap();
        let root = fx
            .index
            .add_tags(&root, &oid(1), &[tag("art", "x"), tag("artist", "y")])
            .unwrap();
        let mut values = Vec::new();
        fx.index
            .for_each_tag_value(&root, "art", |value| {
                values.push(value.to_vec());
                Ok::<_, IndexError>(ControlFlow::Continue(()))
            })
            .unwrap();
        assert_eq!(values, vec![b"x".to_vec()]);
    }

    // ---- search ----

    #[test]
    fn search_and_or() {
        let fx = fixture();
        let root = sample(&fx);
        let and = Query::new(Predicate::and([
            Query::new(Predicate::eq("artist", "Björk")),
            Query::new(Predicate::eq("year", "1997")),
        ]));
        assert_eq!(fx.index.search(&root, &and).unwrap().ids, vec![oid(3)]);

        let or = Query::new(Predicate::or([
            Query::new(Predicate::eq("genre", "electronic")),
            Query::new(Predicate::eq("genre", "trip-hop")),
        ]));
        assert_eq!(fx.index.search(&root, &or).unwrap().ids, vec![oid(1), oid(2)]);
    }

    #[test]
    fn search_missing_key_is_empty() {
        let fx = fixture();
        let root = sample(&fx);
        let rs = fx
            .index
            .search(&root, &Query::new(Predicate::eq("missing", "x")))
            .unwrap();
        assert!(rs.is_empty());
    }

    #[test]
    fn search_reports_corrupt_entries() {
        let fx = fixture();
        let root = sample(&fx);
        let root = fx.kv.put(&root, b"i\x00artist\x00garbage", b"x").unwrap();
        let result = fx
            .index
            .search(&root, &Query::new(Predicate::contains("artist", "B")));
        assert!(matches!(result, Err(IndexError::Corruption(_))));
    }

    #[test]
    fn query_errors_pass_through() {
        let fx = fixture();
        let root = sample(&fx);
        let config = QueryConfig {
            max_depth: 1,
            ..QueryConfig::default()
        };
        let index = TagIndex::new(fx.kv.clone(), config);
        let nested = Query::new(Predicate::and([Query::new(Predicate::Any)]));
        assert!(matches!(
            index.search(&root, &nested),
            Err(IndexError::Query(QueryError::TooDeep { max: 1 }))
        ));
    }

    // ---- consistency ----

    fn physical(fx: &Fixture, root: &Root, prefix: &[u8]) -> Vec<Entry> {
        fx.kv.collect(root, &Span::prefix(prefix)).unwrap()
    }

    proptest! {
        #[test]
        fn forward_and_inverse_agree(
            batches in prop::collection::vec(
                (0u8..4, prop::collection::vec(("[a-c]{1,2}", "[x-z]{0,2}"), 0..5)),
                1..12,
            )
        ) {
            let fx = fixture();
            let mut root = fx.index.new_empty().unwrap();
            for (n, tags) in &batches {
                let tags: Vec<Tag> = tags.iter().map(|(k, v)| tag(k, v)).collect();
                root = fx.index.add_tags(&root, &oid(*n), &tags).unwrap();
            }

            let forward = collect(|out| {
                for e in physical(&fx, &root, keys::FORWARD) {
                    let (oid, key) = keys::parse_forward(&e.key).unwrap();
                    out.insert((key.to_string(), e.value, oid));
                }
            });
            let inverse = collect(|out| {
                for e in physical(&fx, &root, keys::INVERSE) {
                    let (key, value, oid) = keys::parse_inverse(&e.key, &e.value).unwrap();
                    out.insert((key.to_string(), value.to_vec(), oid));
                }
            });
            prop_assert_eq!(&forward, &inverse);

            // Exactly one inverse entry per forward entry.
            prop_assert_eq!(physical(&fx, &root, keys::INVERSE).len(), forward.len());
        }

        #[test]
        fn get_tags_returns_last_values(
            tags in prop::collection::vec(("[a-d]{1,3}", "[^\\x00]{0,8}"), 0..10)
        ) {
            let fx = fixture();
            let root = fx.index.new_empty().unwrap();
            let tags: Vec<Tag> = tags.iter().map(|(k, v)| tag(k, v)).collect();
            let root = fx.index.add_tags(&root, &oid(9), &tags).unwrap();

            let expected: Vec<Tag> = tags
                .iter()
                .map(|t| (t.key.clone(), t.value.clone()))
                .collect::<BTreeMap<_, _>>()
                .into_iter()
                .map(|(k, v)| Tag::new(k, v))
                .collect();
            prop_assert_eq!(fx.index.get_tags(&root, &oid(9)).unwrap(), expected);
        }
    }
}
