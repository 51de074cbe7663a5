//! Filesystem-backed object store.
//!
//! Layout: `<root>/<first two hex chars>/<remaining 62 hex chars>`. Each file
//! holds a one-byte [`ObjectKind`] code followed by the object data. Files
//! are written to a temporary file in the same directory and renamed into
//! place, so a reader never observes a partially written object.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use hoard_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (or create) an object directory at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let raw = match fs::read(self.object_path(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (code, data) = raw.split_first().ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: "empty object file".into(),
        })?;
        let kind = ObjectKind::from_code(*code).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown kind code {code:#04x}"),
        })?;
        let object = StoredObject::new(kind, data.to_vec());
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "object path has no parent"))?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&[object.kind.code()])?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(id = %id.short_hex(), kind = %object.kind, len = object.size(), "object written");
        Ok(id)
    }

    fn contains(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}
