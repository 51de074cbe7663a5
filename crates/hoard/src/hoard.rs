use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex};

use hoard_cell::{apply, Cell, FileCell, InMemoryCell};
use hoard_corpus::Corpus;
use hoard_index::TagIndex;
use hoard_kv::{Kv, Span};
use hoard_query::{Query, ResultSet};
use hoard_store::{FsObjectStore, InMemoryObjectStore, ObjectStore};
use hoard_types::{Oid, Tag};
use lru::LruCache;
use tracing::{debug, info, warn};

use crate::config::HoardConfig;
use crate::error::{HoardError, HoardResult};
use crate::extract::Extractor;
use crate::state::State;

/// A content-addressed archive with a searchable tag index.
///
/// Objects and their tags live in two persistent maps over one object
/// store. The pair of roots is committed through a single [`Cell`], so
/// every [`add`](Self::add) becomes visible all at once or not at all,
/// even with many writers sharing the cell.
pub struct Hoard {
    config: HoardConfig,
    corpus: Corpus,
    index: TagIndex,
    cell: Arc<dyn Cell>,
    extractors: Vec<Arc<dyn Extractor>>,
    suggestions: Mutex<LruCache<Oid, Vec<Tag>>>,
}

impl Hoard {
    pub fn open(config: HoardConfig, store: Arc<dyn ObjectStore>, cell: Arc<dyn Cell>) -> Self {
        let kv = Kv::new(store, config.kv.clone());
        let capacity =
            NonZeroUsize::new(config.suggest_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        info!(
            max_data_size = config.max_data_size,
            max_attempts = config.retry.max_attempts,
            "hoard opened"
        );
        Self {
            corpus: Corpus::new(kv.clone(), config.max_data_size),
            index: TagIndex::new(kv, config.query.clone()),
            cell,
            extractors: Vec::new(),
            suggestions: Mutex::new(LruCache::new(capacity)),
            config,
        }
    }

    pub fn in_memory(config: HoardConfig) -> Self {
        Self::open(
            config,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryCell::new()),
        )
    }

    /// Open (or create) a hoard whose objects and state cell live under
    /// `path`.
    pub fn open_dir(path: impl AsRef<Path>, config: HoardConfig) -> HoardResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let store = FsObjectStore::open(path.join(&config.objects_dir))?;
        let cell = FileCell::new(path.join(&config.cell_file));
        info!(path = %path.display(), "opening hoard directory");
        Ok(Self::open(config, Arc::new(store), Arc::new(cell)))
    }

    /// Register a tag extractor to run on every added object.
    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    pub fn config(&self) -> &HoardConfig {
        &self.config
    }

    /// The committed state, or `None` before the first write.
    pub fn state(&self) -> HoardResult<Option<State>> {
        let raw = self.cell.read()?;
        if raw.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| HoardError::Corruption(format!("state cell: {e}")))
    }

    fn snapshot(&self) -> HoardResult<State> {
        match self.state()? {
            Some(state) => Ok(state),
            None => self.empty_state(),
        }
    }

    fn empty_state(&self) -> HoardResult<State> {
        Ok(State {
            corpus: self.corpus.new_empty()?,
            index: self.index.new_empty()?,
        })
    }

    // ---- Ingestion ----

    /// Store `data`, tag it with every registered extractor, and commit
    /// object and tags in one state transition.
    ///
    /// Adding bytes that are already present (with unchanged tags) leaves
    /// the state as it is.
    pub fn add(&self, data: &[u8]) -> HoardResult<Oid> {
        let oid = Oid::hash(data);
        let mut extracted: Option<Vec<Tag>> = None;

        let committed = apply(
            self.cell.as_ref(),
            &self.config.retry,
            |state: Option<State>| -> HoardResult<Option<State>> {
                let state = match state {
                    Some(state) => state,
                    None => self.empty_state()?,
                };
                let (_, corpus) = self.corpus.post(&state.corpus, data)?;
                // Extraction depends only on the bytes, so a retry reuses it.
                if extracted.is_none() {
                    let stored = self.corpus.get(&corpus, &oid)?;
                    extracted = Some(self.extract(&stored));
                }
                let tags = extracted.as_deref().unwrap_or_default();
                let index = self.index.add_tags(&state.index, &oid, tags)?;

                let next = State { corpus, index };
                Ok((next != state).then_some(next))
            },
        )?;

        let tag_count = extracted.as_ref().map_or(0, Vec::len);
        if let Some(tags) = extracted {
            self.suggestions
                .lock()
                .map_err(|_| HoardError::Poisoned)?
                .put(oid, tags);
        }
        debug!(
            oid = %oid.short_hex(),
            size = data.len(),
            tags = tag_count,
            changed = committed.is_some(),
            "object added"
        );
        Ok(oid)
    }

    /// Attach tags to an object that is already stored. Later values
    /// replace earlier ones under the same key.
    pub fn put_tags(&self, oid: &Oid, tags: &[Tag]) -> HoardResult<()> {
        let not_found = || HoardError::NotFound(format!("object {oid}"));
        let committed = apply(
            self.cell.as_ref(),
            &self.config.retry,
            |state: Option<State>| -> HoardResult<Option<State>> {
                let state = state.ok_or_else(not_found)?;
                if !self.corpus.contains(&state.corpus, oid)? {
                    return Err(not_found());
                }
                let index = self.index.add_tags(&state.index, oid, tags)?;
                Ok((index != state.index).then_some(State { index, ..state }))
            },
        )?;
        debug!(oid = %oid.short_hex(), tags = tags.len(), changed = committed.is_some(), "tags put");
        Ok(())
    }

    /// Objects are never removed from a hoard.
    pub fn delete(&self, oid: &Oid) -> HoardResult<()> {
        let state = self.snapshot()?;
        self.corpus.delete(&state.corpus, oid)?;
        Ok(())
    }

    // ---- Objects ----

    pub fn get(&self, oid: &Oid) -> HoardResult<Vec<u8>> {
        let state = self.snapshot()?;
        Ok(self.corpus.get(&state.corpus, oid)?)
    }

    /// OIDs whose 32 raw bytes fall in `span`, ascending.
    pub fn list_ids(&self, span: &Span) -> HoardResult<Vec<Oid>> {
        let state = self.snapshot()?;
        Ok(self.corpus.list_ids(&state.corpus, span)?)
    }

    /// Find the single stored object whose hex OID starts with `prefix`.
    pub fn resolve_prefix(&self, prefix: &str) -> HoardResult<Oid> {
        let state = self.snapshot()?;
        Ok(self.corpus.resolve_prefix(&state.corpus, prefix)?)
    }

    // ---- Tags ----

    pub fn get_tags(&self, oid: &Oid) -> HoardResult<Vec<Tag>> {
        let state = self.snapshot()?;
        Ok(self.index.get_tags(&state.index, oid)?)
    }

    pub fn get_tag_value(&self, oid: &Oid, key: &str) -> HoardResult<Vec<u8>> {
        let state = self.snapshot()?;
        Ok(self.index.get_tag_value(&state.index, oid, key)?)
    }

    /// Visit every tagged object with its tags, in OID order.
    pub fn for_each<F>(&self, f: F) -> HoardResult<()>
    where
        F: FnMut(Oid, Vec<Tag>) -> HoardResult<ControlFlow<()>>,
    {
        let state = self.snapshot()?;
        self.index.for_each(&state.index, f)
    }

    pub fn for_each_tag_key<F>(&self, f: F) -> HoardResult<()>
    where
        F: FnMut(&str) -> HoardResult<ControlFlow<()>>,
    {
        let state = self.snapshot()?;
        self.index.for_each_tag_key(&state.index, f)
    }

    pub fn for_each_tag_value<F>(&self, key: &str, f: F) -> HoardResult<()>
    where
        F: FnMut(&[u8]) -> HoardResult<ControlFlow<()>>,
    {
        let state = self.snapshot()?;
        self.index.for_each_tag_value(&state.index, key, f)
    }

    /// Tags the registered extractors would produce for a stored object.
    /// Nothing is committed; results are cached per OID.
    pub fn suggest_tags(&self, oid: &Oid) -> HoardResult<Vec<Tag>> {
        if let Some(tags) = self
            .suggestions
            .lock()
            .map_err(|_| HoardError::Poisoned)?
            .get(oid)
        {
            return Ok(tags.clone());
        }

        let data = self.get(oid)?;
        let tags = self.extract(&data);
        self.suggestions
            .lock()
            .map_err(|_| HoardError::Poisoned)?
            .put(*oid, tags.clone());
        Ok(tags)
    }

    // ---- Search ----

    pub fn search(&self, query: &Query) -> HoardResult<ResultSet> {
        let state = self.snapshot()?;
        Ok(self.index.search(&state.index, query)?)
    }

    /// Parse a JSON query and run it.
    pub fn search_json(&self, json: &str) -> HoardResult<ResultSet> {
        let query = Query::from_json(json)?;
        self.search(&query)
    }

    fn extract(&self, data: &[u8]) -> Vec<Tag> {
        let mut tags = Vec::new();
        for extractor in &self.extractors {
            let found = match extractor.extract(data) {
                Ok(found) => found,
                Err(e) => {
                    warn!(extractor = extractor.name(), error = %e, "tag extraction failed");
                    continue;
                }
            };
            for tag in found {
                match tag.validate() {
                    Ok(()) => tags.push(tag),
                    Err(e) => {
                        warn!(extractor = extractor.name(), error = %e, "dropping extracted tag")
                    }
                }
            }
        }
        tags
    }
}
