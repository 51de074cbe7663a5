use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use hoard_store::{ObjectKind, ObjectStore, StoredObject};
use hoard_types::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::KvConfig;
use crate::error::{KvError, KvResult};
use crate::node::{BranchNode, ChildRef, LeafEntry, LeafNode, Node, Value};
use crate::span::Span;

/// Handle to one immutable map snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Root(ObjectId);

impl Root {
    pub const fn from_id(id: ObjectId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> ObjectId {
        self.0
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({})", self.0.short_hex())
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A key/value pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Replace every existing entry inside `span` with `entries`.
///
/// `entries` must be strictly ascending and lie inside `span`. An empty
/// `entries` list deletes the span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub span: Span,
    pub entries: Vec<Entry>,
}

impl Mutation {
    pub fn replace(span: Span, entries: Vec<Entry>) -> Self {
        Self { span, entries }
    }

    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        let entry = Entry::new(key, value);
        Self {
            span: Span::single(&entry.key),
            entries: vec![entry],
        }
    }

    pub fn delete(key: &[u8]) -> Self {
        Self::delete_span(Span::single(key))
    }

    pub fn delete_span(span: Span) -> Self {
        Self {
            span,
            entries: Vec::new(),
        }
    }
}

/// Operator over persistent maps stored in one [`ObjectStore`].
///
/// `Kv` holds no map state of its own; every operation takes the [`Root`]
/// it works on. Cloning is cheap.
#[derive(Clone)]
pub struct Kv {
    store: Arc<dyn ObjectStore>,
    config: KvConfig,
}

impl Kv {
    pub fn new(store: Arc<dyn ObjectStore>, config: KvConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn config(&self) -> &KvConfig {
        &self.config
    }

    /// Write an empty map and return its root.
    pub fn new_empty(&self) -> KvResult<Root> {
        let id = self.store.write(&LeafNode::default().encode()?)?;
        Ok(Root(id))
    }

    pub fn get(&self, root: &Root, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let mut id = root.0;
        loop {
            match self.load(&id)? {
                Node::Branch(branch) => match branch.children.get(branch.child_for(key)) {
                    Some(child) => id = child.id,
                    None => return Ok(None),
                },
                Node::Leaf(leaf) => {
                    return match leaf
                        .entries
                        .binary_search_by(|e| e.key.as_slice().cmp(key))
                    {
                        Ok(i) => self.resolve(&leaf.entries[i].value).map(Some),
                        Err(_) => Ok(None),
                    };
                }
            }
        }
    }

    /// Visit every entry inside `span` in ascending key order until the
    /// callback returns `Break` or an error.
    pub fn for_each<F, E>(&self, root: &Root, span: &Span, mut f: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, E>,
        E: From<KvError>,
    {
        if span.is_empty() {
            return Ok(());
        }
        self.visit(&root.0, span, &mut f).map(|_| ())
    }

    /// Collect every entry inside `span`.
    pub fn collect(&self, root: &Root, span: &Span) -> KvResult<Vec<Entry>> {
        let mut out = Vec::new();
        self.for_each(root, span, |key, value| {
            out.push(Entry::new(key, value));
            Ok::<_, KvError>(ControlFlow::Continue(()))
        })?;
        Ok(out)
    }

    pub fn put(&self, root: &Root, key: &[u8], value: &[u8]) -> KvResult<Root> {
        self.mutate(root, &[Mutation::put(key, value)])
    }

    /// Apply a batch of span replacements and return the new root.
    ///
    /// Mutations must be sorted by span and must not overlap. The input
    /// root stays valid.
    pub fn mutate(&self, root: &Root, mutations: &[Mutation]) -> KvResult<Root> {
        validate(mutations)?;
        if mutations.is_empty() {
            return Ok(*root);
        }

        let mut level = self.rewrite(&root.0, mutations)?;
        let new_root = loop {
            match level.len() {
                0 => break self.new_empty()?,
                1 => break Root(self.collapse(level[0].id)?),
                _ => level = self.write_branches(level)?,
            }
        };

        debug!(
            mutations = mutations.len(),
            old = %root.0.short_hex(),
            new = %new_root.0.short_hex(),
            "map mutated"
        );
        Ok(new_root)
    }

    // ---- reading ----

    fn load(&self, id: &ObjectId) -> KvResult<Node> {
        let object = self
            .store
            .read(id)?
            .ok_or(KvError::MissingObject(*id))?;
        Node::decode(id, &object)
    }

    fn resolve(&self, value: &Value) -> KvResult<Vec<u8>> {
        match value {
            Value::Inline(bytes) => Ok(bytes.clone()),
            Value::External { id, .. } => {
                let object = self
                    .store
                    .read(id)?
                    .ok_or(KvError::MissingObject(*id))?;
                if object.kind != ObjectKind::Blob {
                    return Err(KvError::UnexpectedKind {
                        id: *id,
                        expected: ObjectKind::Blob,
                        found: object.kind,
                    });
                }
                Ok(object.data)
            }
        }
    }

    fn visit<E>(
        &self,
        id: &ObjectId,
        span: &Span,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, E>,
    ) -> Result<ControlFlow<()>, E>
    where
        E: From<KvError>,
    {
        match self.load(id)? {
            Node::Leaf(leaf) => {
                let start = leaf.entries.partition_point(|e| e.key < span.begin);
                for entry in &leaf.entries[start..] {
                    // Past the end: nothing to the right can match either.
                    if !span.below_end(&entry.key) {
                        return Ok(ControlFlow::Break(()));
                    }
                    let value = self.resolve(&entry.value)?;
                    if f(&entry.key, &value)?.is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            }
            Node::Branch(branch) => {
                let start = branch.child_for(&span.begin);
                for child in branch.children.iter().skip(start) {
                    if !span.below_end(&child.first_key) {
                        return Ok(ControlFlow::Break(()));
                    }
                    if self.visit(&child.id, span, f)?.is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            }
        }
    }

    // ---- writing ----

    /// Rewrite the subtree at `id` and return its replacement siblings,
    /// which sit at the same height as the original node.
    fn rewrite(&self, id: &ObjectId, mutations: &[Mutation]) -> KvResult<Vec<ChildRef>> {
        match self.load(id)? {
            Node::Leaf(leaf) => self.rewrite_leaf(leaf, mutations),
            Node::Branch(branch) => self.rewrite_branch(branch, mutations),
        }
    }

    fn rewrite_leaf(&self, leaf: LeafNode, mutations: &[Mutation]) -> KvResult<Vec<ChildRef>> {
        let kept: Vec<LeafEntry> = leaf
            .entries
            .into_iter()
            .filter(|e| !covered(mutations, &e.key))
            .collect();

        let mut incoming = Vec::new();
        for mutation in mutations {
            for entry in &mutation.entries {
                incoming.push(LeafEntry {
                    key: entry.key.clone(),
                    value: self.store_value(&entry.value)?,
                });
            }
        }

        // Kept keys lie outside every span and incoming keys lie inside
        // one, so the two sorted runs never share a key.
        let mut merged = Vec::with_capacity(kept.len() + incoming.len());
        let mut kept = kept.into_iter().peekable();
        let mut incoming = incoming.into_iter().peekable();
        loop {
            let take_kept = match (kept.peek(), incoming.peek()) {
                (Some(a), Some(b)) => a.key < b.key,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            merged.extend(if take_kept {
                kept.next()
            } else {
                incoming.next()
            });
        }

        self.write_leaves(merged)
    }

    fn rewrite_branch(
        &self,
        branch: BranchNode,
        mutations: &[Mutation],
    ) -> KvResult<Vec<ChildRef>> {
        let mut out = Vec::with_capacity(branch.children.len());
        let mut cursor = 0;

        for (i, child) in branch.children.iter().enumerate() {
            let lo = (i > 0).then_some(child.first_key.as_slice());
            let hi = branch
                .children
                .get(i + 1)
                .map(|next| next.first_key.as_slice());

            if let Some(lo) = lo {
                while cursor < mutations.len()
                    && mutations[cursor]
                        .span
                        .end
                        .as_deref()
                        .map_or(false, |end| end <= lo)
                {
                    cursor += 1;
                }
            }

            let mut clipped = Vec::new();
            for mutation in &mutations[cursor..] {
                if hi.map_or(false, |hi| mutation.span.begin.as_slice() >= hi) {
                    break;
                }
                clipped.push(clip(mutation, lo, hi));
            }

            if clipped.is_empty() {
                out.push(child.clone());
            } else {
                out.extend(self.rewrite(&child.id, &clipped)?);
            }
        }

        self.write_branches(out)
    }

    fn store_value(&self, value: &[u8]) -> KvResult<Value> {
        if value.len() <= self.config.inline_threshold {
            return Ok(Value::Inline(value.to_vec()));
        }
        let id = self
            .store
            .write(&StoredObject::new(ObjectKind::Blob, value.to_vec()))?;
        Ok(Value::External {
            id,
            len: value.len() as u64,
        })
    }

    fn write_leaves(&self, entries: Vec<LeafEntry>) -> KvResult<Vec<ChildRef>> {
        let mut out = Vec::new();
        for chunk in balanced_chunks(entries, self.config.leaf_fanout()) {
            let Some(first_key) = chunk.first().map(|e| e.key.clone()) else {
                continue;
            };
            let id = self.store.write(&LeafNode { entries: chunk }.encode()?)?;
            out.push(ChildRef { first_key, id });
        }
        Ok(out)
    }

    fn write_branches(&self, children: Vec<ChildRef>) -> KvResult<Vec<ChildRef>> {
        let mut out = Vec::new();
        for chunk in balanced_chunks(children, self.config.branch_fanout()) {
            let Some(first_key) = chunk.first().map(|c| c.first_key.clone()) else {
                continue;
            };
            let id = self
                .store
                .write(&BranchNode { children: chunk }.encode()?)?;
            out.push(ChildRef { first_key, id });
        }
        Ok(out)
    }

    /// Strip single-child branches off the top of a tree.
    fn collapse(&self, mut id: ObjectId) -> KvResult<ObjectId> {
        loop {
            match self.load(&id)? {
                Node::Branch(branch) if branch.children.len() == 1 => {
                    id = branch.children[0].id;
                }
                _ => return Ok(id),
            }
        }
    }
}

fn validate(mutations: &[Mutation]) -> KvResult<()> {
    for (i, mutation) in mutations.iter().enumerate() {
        if mutation.span.is_empty() {
            return Err(KvError::InvalidMutation(format!(
                "mutation {i} has empty span {:?}",
                mutation.span
            )));
        }
        if mutation.entries.windows(2).any(|w| w[0].key >= w[1].key) {
            return Err(KvError::InvalidMutation(format!(
                "entries of mutation {i} are not strictly ascending"
            )));
        }
        if let Some(entry) = mutation
            .entries
            .iter()
            .find(|e| !mutation.span.contains(&e.key))
        {
            return Err(KvError::InvalidMutation(format!(
                "key {} lies outside span {:?}",
                entry.key.escape_ascii(),
                mutation.span
            )));
        }
        if let Some(next) = mutations.get(i + 1) {
            let ordered = mutation
                .span
                .end
                .as_deref()
                .map_or(false, |end| end <= next.span.begin.as_slice());
            if !ordered {
                return Err(KvError::InvalidMutation(format!(
                    "mutations {i} and {} overlap or are out of order",
                    i + 1
                )));
            }
        }
    }
    Ok(())
}

/// `true` if `key` falls inside one of the sorted, disjoint spans.
fn covered(mutations: &[Mutation], key: &[u8]) -> bool {
    let idx = mutations.partition_point(|m| m.span.begin.as_slice() <= key);
    idx > 0 && mutations[idx - 1].span.contains(key)
}

/// Restrict a mutation to the child key range `[lo, hi)`.
fn clip(mutation: &Mutation, lo: Option<&[u8]>, hi: Option<&[u8]>) -> Mutation {
    let begin = match lo {
        Some(lo) if lo > mutation.span.begin.as_slice() => lo.to_vec(),
        _ => mutation.span.begin.clone(),
    };
    let end = match (mutation.span.end.as_deref(), hi) {
        (Some(end), Some(hi)) => Some(end.min(hi).to_vec()),
        (Some(end), None) => Some(end.to_vec()),
        (None, Some(hi)) => Some(hi.to_vec()),
        (None, None) => None,
    };
    let entries = mutation
        .entries
        .iter()
        .filter(|e| {
            lo.map_or(true, |lo| e.key.as_slice() >= lo)
                && hi.map_or(true, |hi| e.key.as_slice() < hi)
        })
        .cloned()
        .collect();
    Mutation {
        span: Span { begin, end },
        entries,
    }
}

/// Split `items` into the fewest chunks of at most `max` items, with chunk
/// sizes differing by at most one.
fn balanced_chunks<T>(items: Vec<T>, max: usize) -> Vec<Vec<T>> {
    let len = items.len();
    if len == 0 {
        return Vec::new();
    }
    let count = len.div_ceil(max);
    let base = len / count;
    let extra = len % count;

    let mut iter = items.into_iter();
    (0..count)
        .map(|i| iter.by_ref().take(base + usize::from(i < extra)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hoard_store::InMemoryObjectStore;
    use proptest::prelude::*;

    use super::*;

    fn small_kv() -> Kv {
        Kv::new(
            Arc::new(InMemoryObjectStore::new()),
            KvConfig {
                max_leaf_entries: 4,
                max_branch_children: 3,
                inline_threshold: 8,
            },
        )
    }

    fn key(i: u32) -> Vec<u8> {
        format!("key-{i:05}").into_bytes()
    }

    fn fill(kv: &Kv, n: u32) -> Root {
        let mutations: Vec<Mutation> = (0..n)
            .map(|i| Mutation::put(key(i), format!("v{i}").into_bytes()))
            .collect();
        let root = kv.new_empty().unwrap();
        kv.mutate(&root, &mutations).unwrap()
    }

    // ---- basic reads and writes ----

    #[test]
    fn empty_map_has_no_entries() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        assert_eq!(kv.get(&root, b"a").unwrap(), None);
        assert!(kv.collect(&root, &Span::all()).unwrap().is_empty());
    }

    #[test]
    fn put_then_get() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let root = kv.put(&root, b"a", b"1").unwrap();
        assert_eq!(kv.get(&root, b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(kv.get(&root, b"b").unwrap(), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let root = kv.put(&root, b"a", b"1").unwrap();
        let root = kv.put(&root, b"a", b"2").unwrap();
        assert_eq!(kv.get(&root, b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(kv.collect(&root, &Span::all()).unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_key() {
        let kv = small_kv();
        let root = fill(&kv, 3);
        let root = kv.mutate(&root, &[Mutation::delete(&key(1))]).unwrap();
        assert_eq!(kv.get(&root, &key(1)).unwrap(), None);
        assert!(kv.get(&root, &key(0)).unwrap().is_some());
        assert!(kv.get(&root, &key(2)).unwrap().is_some());
    }

    #[test]
    fn large_values_stored_out_of_line() {
        let kv = small_kv();
        let big = vec![0xab; 1000];
        let root = kv.new_empty().unwrap();
        let root = kv.put(&root, b"big", &big).unwrap();
        assert_eq!(kv.get(&root, b"big").unwrap(), Some(big.clone()));

        let entries = kv.collect(&root, &Span::all()).unwrap();
        assert_eq!(entries, vec![Entry::new(b"big".to_vec(), big)]);
    }

    #[test]
    fn empty_batch_returns_same_root() {
        let kv = small_kv();
        let root = fill(&kv, 5);
        assert_eq!(kv.mutate(&root, &[]).unwrap(), root);
    }

    // ---- splitting and collapsing ----

    #[test]
    fn many_entries_split_and_stay_sorted() {
        let kv = small_kv();
        let root = fill(&kv, 200);
        let entries = kv.collect(&root, &Span::all()).unwrap();
        assert_eq!(entries.len(), 200);
        assert!(entries.windows(2).all(|w| w[0].key < w[1].key));
        for i in [0, 57, 199] {
            assert_eq!(
                kv.get(&root, &key(i)).unwrap(),
                Some(format!("v{i}").into_bytes())
            );
        }
    }

    #[test]
    fn deleting_everything_yields_empty_map() {
        let kv = small_kv();
        let root = fill(&kv, 100);
        let root = kv
            .mutate(&root, &[Mutation::delete_span(Span::all())])
            .unwrap();
        assert!(kv.collect(&root, &Span::all()).unwrap().is_empty());
        assert_eq!(root, kv.new_empty().unwrap());
    }

    #[test]
    fn span_replace_drops_old_entries_in_range() {
        let kv = small_kv();
        let root = fill(&kv, 50);
        let span = Span::new(key(10), Some(key(20)));
        let root = kv
            .mutate(
                &root,
                &[Mutation::replace(span.clone(), vec![Entry::new(key(15), "new")])],
            )
            .unwrap();
        let inside = kv.collect(&root, &span).unwrap();
        assert_eq!(inside, vec![Entry::new(key(15), "new")]);
        assert_eq!(kv.collect(&root, &Span::all()).unwrap().len(), 41);
    }

    #[test]
    fn inserts_below_first_key_route_to_first_child() {
        let kv = small_kv();
        let root = fill(&kv, 40);
        let root = kv.put(&root, b"aaa", b"first").unwrap();
        let entries = kv.collect(&root, &Span::all()).unwrap();
        assert_eq!(entries[0], Entry::new(b"aaa".to_vec(), b"first".to_vec()));
        assert_eq!(entries.len(), 41);
    }

    // ---- snapshots ----

    #[test]
    fn old_roots_stay_readable() {
        let kv = small_kv();
        let before = fill(&kv, 30);
        let after = kv.mutate(&before, &[Mutation::delete(&key(3))]).unwrap();
        assert_ne!(before, after);
        assert!(kv.get(&before, &key(3)).unwrap().is_some());
        assert!(kv.get(&after, &key(3)).unwrap().is_none());
    }

    #[test]
    fn same_history_gives_same_root() {
        let a = fill(&small_kv(), 60);
        let b = fill(&small_kv(), 60);
        assert_eq!(a, b);
    }

    #[test]
    fn rewriting_identical_value_keeps_root() {
        let kv = small_kv();
        let root = fill(&kv, 60);
        let again = kv.put(&root, &key(7), b"v7").unwrap();
        assert_eq!(root, again);
    }

    // ---- range iteration ----

    #[test]
    fn for_each_respects_span() {
        let kv = small_kv();
        let root = fill(&kv, 100);
        let got = kv
            .collect(&root, &Span::new(key(25), Some(key(30))))
            .unwrap();
        let keys: Vec<_> = got.into_iter().map(|e| e.key).collect();
        assert_eq!(keys, (25..30).map(key).collect::<Vec<_>>());
    }

    #[test]
    fn for_each_prefix_span() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let root = kv
            .mutate(
                &root,
                &[
                    Mutation::put(b"a/1".to_vec(), b"x".to_vec()),
                    Mutation::put(b"b/1".to_vec(), b"y".to_vec()),
                    Mutation::put(b"b/2".to_vec(), b"z".to_vec()),
                    Mutation::put(b"c/1".to_vec(), b"w".to_vec()),
                ],
            )
            .unwrap();
        let got = kv.collect(&root, &Span::prefix(b"b/")).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn for_each_stops_on_break() {
        let kv = small_kv();
        let root = fill(&kv, 100);
        let mut seen = 0;
        kv.for_each(&root, &Span::all(), |_, _| {
            seen += 1;
            Ok::<_, KvError>(if seen == 7 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })
        .unwrap();
        assert_eq!(seen, 7);
    }

    #[derive(Debug)]
    enum VisitError {
        Kv(KvError),
        Stop,
    }

    impl From<KvError> for VisitError {
        fn from(e: KvError) -> Self {
            Self::Kv(e)
        }
    }

    #[test]
    fn for_each_propagates_callback_error() {
        let kv = small_kv();
        let root = fill(&kv, 10);
        let result = kv.for_each(&root, &Span::all(), |_, _| Err(VisitError::Stop));
        assert!(matches!(result, Err(VisitError::Stop)));
    }

    #[test]
    fn missing_node_is_reported() {
        let kv = small_kv();
        let bogus = Root::from_id(ObjectId::from_hash([9; 32]));
        assert!(matches!(
            kv.get(&bogus, b"a"),
            Err(KvError::MissingObject(_))
        ));
        assert!(matches!(
            kv.collect(&bogus, &Span::all()),
            Err(KvError::MissingObject(_))
        ));
    }

    // ---- validation ----

    #[test]
    fn rejects_overlapping_mutations() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let result = kv.mutate(
            &root,
            &[
                Mutation::delete_span(Span::new(b"a".to_vec(), Some(b"m".to_vec()))),
                Mutation::delete_span(Span::new(b"k".to_vec(), Some(b"z".to_vec()))),
            ],
        );
        assert!(matches!(result, Err(KvError::InvalidMutation(_))));
    }

    #[test]
    fn rejects_unsorted_mutations() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let result = kv.mutate(
            &root,
            &[
                Mutation::put(b"b".to_vec(), b"1".to_vec()),
                Mutation::put(b"a".to_vec(), b"2".to_vec()),
            ],
        );
        assert!(matches!(result, Err(KvError::InvalidMutation(_))));
    }

    #[test]
    fn rejects_entry_outside_span() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let result = kv.mutate(
            &root,
            &[Mutation::replace(
                Span::prefix(b"a"),
                vec![Entry::new(b"b".to_vec(), b"1".to_vec())],
            )],
        );
        assert!(matches!(result, Err(KvError::InvalidMutation(_))));
    }

    #[test]
    fn rejects_unsorted_entries() {
        let kv = small_kv();
        let root = kv.new_empty().unwrap();
        let result = kv.mutate(
            &root,
            &[Mutation::replace(
                Span::all(),
                vec![Entry::new(b"b".to_vec(), vec![]), Entry::new(b"a".to_vec(), vec![])],
            )],
        );
        assert!(matches!(result, Err(KvError::InvalidMutation(_))));
    }

    #[test]
    fn balanced_chunk_sizes() {
        let sizes: Vec<usize> = balanced_chunks((0..10).collect::<Vec<_>>(), 4)
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert!(balanced_chunks(Vec::<u8>::new(), 4).is_empty());
    }

    // ---- model check ----

    proptest! {
        #[test]
        fn matches_btreemap_model(
            batches in prop::collection::vec(
                prop::collection::vec((0u8..64, prop::option::of(any::<u8>())), 1..24),
                1..8,
            )
        ) {
            let kv = small_kv();
            let mut root = kv.new_empty().unwrap();
            let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

            for batch in batches {
                let mut ops: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
                for (k, v) in batch {
                    let value = v.map(|b| vec![b; usize::from(b % 20)]);
                    ops.insert(vec![b'k', k], value);
                }
                let mutations: Vec<Mutation> = ops
                    .iter()
                    .map(|(k, v)| match v {
                        Some(v) => Mutation::put(k.clone(), v.clone()),
                        None => Mutation::delete(k),
                    })
                    .collect();
                root = kv.mutate(&root, &mutations).unwrap();
                for (k, v) in ops {
                    match v {
                        Some(v) => { model.insert(k, v); }
                        None => { model.remove(&k); }
                    }
                }
            }

            let got: Vec<(Vec<u8>, Vec<u8>)> = kv
                .collect(&root, &Span::all())
                .unwrap()
                .into_iter()
                .map(|e| (e.key, e.value))
                .collect();
            let want: Vec<(Vec<u8>, Vec<u8>)> = model.clone().into_iter().collect();
            prop_assert_eq!(got, want);

            for k in 0u8..64 {
                let key = vec![b'k', k];
                prop_assert_eq!(kv.get(&root, &key).unwrap(), model.get(&key).cloned());
            }
        }
    }
}
