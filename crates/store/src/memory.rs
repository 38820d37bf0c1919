use async_trait::async_trait;
use tokio::sync::RwLock;

use events::{EventId, EventStore, NormalizedEvent, StoreError, StoredEvent};

/// Process-local [`EventStore`] backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored so far.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: NormalizedEvent) -> Result<EventId, StoreError> {
        let id = EventId::new_random();
        self.events.write().await.push(StoredEvent::new(id, event));
        tracing::debug!(event_id = %id, "event stored in memory");
        Ok(id)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let events = self.events.read().await;
        // Newest inserts first so the stable sort breaks timestamp ties the same
        // way `newest_first` does.
        let mut recent: Vec<&StoredEvent> = events.iter().rev().collect();
        recent.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
        Ok(recent.into_iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use events::{AuthorName, BranchName, EventAction, Timestamp};

    use super::*;

    fn push_at(minute: i64, branch: &str) -> NormalizedEvent {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        NormalizedEvent {
            action: EventAction::Push,
            author: AuthorName::new("alice").unwrap(),
            from_branch: None,
            to_branch: BranchName::new(branch).unwrap(),
            timestamp: Timestamp::from_utc(base + Duration::minutes(minute)),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find_recent_returns_record_with_id() {
        let store = InMemoryEventStore::new();

        let id = store.insert(push_at(0, "main")).await.unwrap();
        let recent = store.find_recent(20).await.unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].event, push_at(0, "main"));
    }

    #[tokio::test]
    async fn test_find_recent_is_newest_first_and_capped() {
        let store = InMemoryEventStore::new();
        for minute in [3, 25, 0, 12, 7, 1, 2, 4, 5, 6, 8, 9, 10, 11, 13, 14, 15, 16, 17, 18, 19, 20] {
            store.insert(push_at(minute, "main")).await.unwrap();
        }

        let recent = store.find_recent(20).await.unwrap();

        assert_eq!(recent.len(), 20);
        assert!(recent
            .windows(2)
            .all(|pair| pair[0].event.timestamp >= pair[1].event.timestamp));
        assert_eq!(recent[0].event.timestamp, push_at(25, "main").timestamp);
    }

    #[tokio::test]
    async fn test_out_of_order_inserts_list_by_timestamp() {
        let store = InMemoryEventStore::new();
        let late = store.insert(push_at(10, "late")).await.unwrap();
        let early = store.insert(push_at(2, "early")).await.unwrap();
        let tie = store.insert(push_at(10, "tie")).await.unwrap();

        let recent = store.find_recent(2).await.unwrap();

        let ids: Vec<_> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![tie, late]);
        assert_eq!(store.find_recent(3).await.unwrap()[2].id, early);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_all_kept() {
        let store = Arc::new(InMemoryEventStore::new());

        let handles: Vec<_> = (0..50)
            .map(|minute| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(push_at(minute, "dev")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 50);
    }
}
