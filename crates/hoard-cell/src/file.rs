use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::cell::Cell;
use crate::error::{CellError, CellResult};

/// `[len: u32 LE] [crc32: u32 LE]`
const HEADER_SIZE: usize = 8;

/// Cell stored in a single file.
///
/// Updates write a temporary file next to the target and rename it into
/// place, so a reader never sees a half-written payload. Swaps are
/// serialized by an in-process lock; separate processes sharing one file
/// are not coordinated.
#[derive(Debug)]
pub struct FileCell {
    path: PathBuf,
    lock: Mutex<()>,
    max_size: usize,
}

impl FileCell {
    pub const DEFAULT_MAX_SIZE: usize = 1 << 16;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_max_size(path, Self::DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(path: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            max_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CellResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(raw) => decode_frame(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, payload: &[u8]) -> CellResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encode_frame(payload))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), size = payload.len(), "cell written");
        Ok(())
    }
}

impl Cell for FileCell {
    fn read(&self) -> CellResult<Vec<u8>> {
        let _guard = self.lock.lock().map_err(|_| CellError::Poisoned)?;
        self.load()
    }

    fn compare_and_swap(&self, prev: &[u8], next: &[u8]) -> CellResult<bool> {
        if next.len() > self.max_size {
            return Err(CellError::TooLarge {
                size: next.len(),
                max: self.max_size,
            });
        }
        let _guard = self.lock.lock().map_err(|_| CellError::Poisoned)?;
        if self.load()? != prev {
            return Ok(false);
        }
        self.store(next)?;
        Ok(true)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}

fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn decode_frame(raw: &[u8]) -> CellResult<Vec<u8>> {
    let Some((header, payload)) = raw.split_first_chunk::<HEADER_SIZE>() else {
        return Err(CellError::Corruption(format!(
            "file is {} bytes, shorter than the frame header",
            raw.len()
        )));
    };
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length != payload.len() {
        return Err(CellError::Corruption(format!(
            "frame declares {length} bytes but holds {}",
            payload.len()
        )));
    }
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(CellError::Corruption(format!(
            "crc mismatch: expected {expected_crc:08x}, got {actual_crc:08x}"
        )));
    }
    Ok(payload.to_vec())
}
