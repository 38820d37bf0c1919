//! The storage port.
//!
//! The ingestion service depends only on [`EventStore`]; backends live in the
//! `store` crate and are chosen by the composition root.

use async_trait::async_trait;

use crate::{EventId, NormalizedEvent, StoreError, StoredEvent};

/// Append-only persistence for normalized events.
///
/// Implementations must tolerate concurrent `insert` and `find_recent` calls
/// without any locking by the caller. Records are never updated or removed.
///
/// Record timestamps are assigned at normalization, before `insert` is
/// awaited, so two concurrent deliveries may reach the backing medium in the
/// opposite order to their timestamps. Listing order is defined by the
/// timestamp alone; backends must sort on it rather than rely on write order.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists `event` and returns the identifier assigned to it.
    async fn insert(&self, event: NormalizedEvent) -> Result<EventId, StoreError>;

    /// Returns at most `limit` records ordered by `timestamp`, newest first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, StoreError>;
}

/// Sorts `events` newest-first and keeps the first `limit`.
///
/// Shared by backends that hold records in insertion order.
pub fn newest_first(mut events: Vec<StoredEvent>, limit: usize) -> Vec<StoredEvent> {
    // Reversed before the stable sort so equal timestamps list the latest insert first.
    events.reverse();
    events.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
    events.truncate(limit);
    events
}
