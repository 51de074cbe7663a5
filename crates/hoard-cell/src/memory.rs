use std::sync::Mutex;

use crate::cell::Cell;
use crate::error::{CellError, CellResult};

#[derive(Debug)]
pub struct InMemoryCell {
    data: Mutex<Vec<u8>>,
    max_size: usize,
}

impl InMemoryCell {
    pub const DEFAULT_MAX_SIZE: usize = 1 << 16;

    pub fn new() -> Self {
        Self::with_max_size(Self::DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            data: Mutex::new(Vec::new()),
            max_size,
        }
    }
}

impl Default for InMemoryCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell for InMemoryCell {
    fn read(&self) -> CellResult<Vec<u8>> {
        let data = self.data.lock().map_err(|_| CellError::Poisoned)?;
        Ok(data.clone())
    }

    fn compare_and_swap(&self, prev: &[u8], next: &[u8]) -> CellResult<bool> {
        if next.len() > self.max_size {
            return Err(CellError::TooLarge {
                size: next.len(),
                max: self.max_size,
            });
        }
        let mut data = self.data.lock().map_err(|_| CellError::Poisoned)?;
        if data.as_slice() != prev {
            return Ok(false);
        }
        *data = next.to_vec();
        Ok(true)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert!(InMemoryCell::new().read().unwrap().is_empty());
    }

    #[test]
    fn swap_requires_matching_prev() {
        let cell = InMemoryCell::new();
        assert!(cell.compare_and_swap(b"", b"one").unwrap());
        assert!(!cell.compare_and_swap(b"", b"two").unwrap());
        assert_eq!(cell.read().unwrap(), b"one");
        assert!(cell.compare_and_swap(b"one", b"two").unwrap());
        assert_eq!(cell.read().unwrap(), b"two");
    }

    #[test]
    fn oversized_payload_rejected() {
        let cell = InMemoryCell::with_max_size(4);
        assert!(matches!(
            cell.compare_and_swap(b"", b"12345"),
            Err(CellError::TooLarge { size: 5, max: 4 })
        ));
        assert!(cell.read().unwrap().is_empty());
    }
}
