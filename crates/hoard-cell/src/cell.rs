use crate::error::CellResult;

/// Single-slot register with compare-and-swap updates.
///
/// An empty byte string is the initial state.
pub trait Cell: Send + Sync {
    fn read(&self) -> CellResult<Vec<u8>>;

    /// Replace the contents with `next` if they currently equal `prev`.
    /// Returns whether the swap happened.
    fn compare_and_swap(&self, prev: &[u8], next: &[u8]) -> CellResult<bool>;

    /// Largest payload `compare_and_swap` accepts.
    fn max_size(&self) -> usize;
}
