use hoard_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Immutable, content-addressed storage for tree nodes and blobs.
///
/// An object's ID is derived from its kind and bytes, so writing the same
/// object twice is harmless and returns the same ID. Nothing is ever
/// deleted. Implementations are shared across threads without external
/// locking.
pub trait ObjectStore: Send + Sync {
    /// `Ok(None)` when no object has that ID.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.read(id)?.is_some())
    }
}
