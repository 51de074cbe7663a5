use std::collections::HashMap;
use std::sync::RwLock;

use hoard_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object counts for an [`InMemoryObjectStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub objects: usize,
    pub bytes: usize,
}

/// Object store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        let Ok(objects) = self.objects.read() else {
            return StoreStats::default();
        };
        StoreStats {
            objects: objects.len(),
            bytes: objects.values().map(StoredObject::size).sum(),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let objects = self.objects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(objects.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if self.contains(&id)? {
            return Ok(id);
        }
        self.objects
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .entry(id)
            .or_insert_with(|| object.clone());
        Ok(id)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        let objects = self.objects.read().map_err(|_| StoreError::Poisoned)?;
        Ok(objects.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::object::ObjectKind;

    fn node(kind: ObjectKind, bytes: &[u8]) -> StoredObject {
        StoredObject::new(kind, bytes.to_vec())
    }

    #[test]
    fn stored_nodes_read_back() {
        let store = InMemoryObjectStore::new();
        let leaf = node(ObjectKind::Leaf, b"entries");
        let id = store.write(&leaf).unwrap();
        assert_eq!(id, leaf.compute_id());
        assert_eq!(store.read(&id).unwrap(), Some(leaf));
        assert!(store.contains(&id).unwrap());
    }

    #[test]
    fn unknown_id_is_absent() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_hash([7; 32]);
        assert_eq!(store.read(&id).unwrap(), None);
        assert!(!store.contains(&id).unwrap());
    }

    #[test]
    fn duplicate_writes_are_stored_once() {
        let store = InMemoryObjectStore::new();
        store.write(&node(ObjectKind::Blob, b"abc")).unwrap();
        store.write(&node(ObjectKind::Blob, b"abc")).unwrap();
        store.write(&node(ObjectKind::Leaf, b"abc")).unwrap();
        assert_eq!(store.stats(), StoreStats { objects: 2, bytes: 6 });
    }

    #[test]
    fn shared_between_writer_threads() {
        let store = Arc::new(InMemoryObjectStore::new());
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25u8 {
                        store.write(&node(ObjectKind::Blob, &[t, i])).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.stats().objects, 100);
    }
}
