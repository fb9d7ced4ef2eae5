use thiserror::Error;

/// Errors reported by a [`Cursor`](crate::Cursor).
///
/// Lookups of absent keys are never errors; they return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The map was structurally modified by something other than the cursor
    /// since the cursor last observed it. The cursor is unusable afterwards.
    #[error("map was modified outside the cursor (expected modification {expected}, found {found})")]
    ConcurrentModification {
        /// Modification count the cursor last observed.
        expected: usize,
        /// Modification count of the map at the time of the check.
        found: usize,
    },
    /// [`Cursor::remove`](crate::Cursor::remove) was called without a
    /// preceding successful [`Cursor::next`](crate::Cursor::next), or twice for
    /// the same entry.
    #[error("remove requires a preceding successful call to next")]
    InvalidState,
    /// The cursor was handed a map other than the one that created it.
    #[error("cursor used with a map other than the one that created it")]
    ForeignMap,
}

/// Result type used by fallible cursor operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
