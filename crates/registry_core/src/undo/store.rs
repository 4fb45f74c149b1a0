//! Storage contract consumed by the soft-delete coordinator.

use std::fmt::Display;

/// Backing store for snapshot records.
///
/// Calls are treated as opaque remote operations; their failures are
/// reported, never retried.
pub trait RecordStore<R> {
    type Error: Display;

    /// Returns every stored record.
    fn fetch_all(&self) -> Result<Vec<R>, Self::Error>;

    /// Permanently removes the record with `id`.
    fn commit_delete(&self, id: &str) -> Result<(), Self::Error>;

    /// Inserts or replaces `record` with its full attribute set.
    fn restore(&self, record: &R) -> Result<(), Self::Error>;
}
