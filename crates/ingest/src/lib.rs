//! hookfeed ingestion service.
//!
//! [`IngestionService`] sits between the HTTP surface and the storage port. For
//! every inbound notification it runs the normalizer, stores accepted records,
//! and logs everything it discards. It contains no parsing rules of its own.
//!
//! ## Delivery contract
//!
//! Ingestion is at-most-once and fire-and-forget: once a notification has been
//! received it is acknowledged, whether it was stored, ignored, or invalid. No
//! retry is ever requested from the sender.
//!
//! A failed append is always logged at `error` level. What the sender sees is
//! governed by [`StoreFailurePolicy`]: with [`StoreFailurePolicy::LogOnly`]
//! the notification is still acknowledged, with
//! [`StoreFailurePolicy::FailResponse`] the error is returned to the caller.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use events::{
    normalize, EventId, EventStore, IgnoreReason, Normalization, StoreError, StoredEvent,
    RECENT_EVENTS_LIMIT,
};

/// Errors surfaced by [`IngestionService`] operations.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The event store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a failed append is reported to the webhook sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Log the failure and acknowledge the notification anyway.
    #[default]
    LogOnly,
    /// Log the failure and return it, so the sender sees an error response.
    FailResponse,
}

impl std::str::FromStr for StoreFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_only" => Ok(StoreFailurePolicy::LogOnly),
            "fail_response" => Ok(StoreFailurePolicy::FailResponse),
            other => Err(format!(
                "unknown store failure policy '{other}' (expected 'log_only' or 'fail_response')"
            )),
        }
    }
}

/// What happened to one received notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receipt {
    /// The notification was normalized and stored under this identifier.
    Stored(EventId),
    /// The notification was well-formed but not recorded.
    Ignored(IgnoreReason),
    /// The notification's payload was malformed for its event type.
    Invalid,
    /// The notification was normalized but the store rejected it, and the
    /// policy is [`StoreFailurePolicy::LogOnly`].
    StoreFailed,
}

/// Receives webhook notifications and serves the recent-events feed.
pub struct IngestionService {
    store: Arc<dyn EventStore>,
    failure_policy: StoreFailurePolicy,
}

impl IngestionService {
    pub fn new(store: Arc<dyn EventStore>, failure_policy: StoreFailurePolicy) -> Self {
        Self {
            store,
            failure_policy,
        }
    }

    /// Normalizes one notification and stores it if it maps onto a record.
    ///
    /// `event_type` is the `X-GitHub-Event` header, `None` if the request had
    /// none. Returns `Err` only for a store failure under
    /// [`StoreFailurePolicy::FailResponse`].
    #[tracing::instrument(skip_all, fields(event_type = event_type.unwrap_or("<none>")))]
    pub async fn receive_notification(
        &self,
        event_type: Option<&str>,
        payload: &Value,
    ) -> Result<Receipt, IngestError> {
        let event = match normalize(event_type, payload) {
            Normalization::Accepted(event) => event,
            Normalization::Ignored(reason) => {
                tracing::info!(%reason, "notification ignored");
                return Ok(Receipt::Ignored(reason));
            }
            Normalization::Invalid(error) => {
                tracing::warn!(%error, "notification discarded: invalid payload");
                return Ok(Receipt::Invalid);
            }
        };

        let action = event.action;
        match self.store.insert(event).await {
            Ok(id) => {
                tracing::info!(event_id = %id, %action, "event stored");
                Ok(Receipt::Stored(id))
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    %action,
                    policy = ?self.failure_policy,
                    "failed to store normalized event"
                );
                match self.failure_policy {
                    StoreFailurePolicy::LogOnly => Ok(Receipt::StoreFailed),
                    StoreFailurePolicy::FailResponse => Err(error.into()),
                }
            }
        }
    }

    /// Returns the most recent stored events, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_recent(&self) -> Result<Vec<StoredEvent>, IngestError> {
        let events = self.store.find_recent(RECENT_EVENTS_LIMIT).await.map_err(|error| {
            tracing::error!(%error, "failed to read recent events");
            error
        })?;
        tracing::debug!(count = events.len(), "recent events loaded");
        Ok(events)
    }
}
