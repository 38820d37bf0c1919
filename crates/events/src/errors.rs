//! Error types for the event domain.
//!
//! [`InvalidPayload`] is the normalizer's "structurally broken" outcome. It is
//! never propagated to the webhook sender; it exists so callers can log the
//! precise defect.
//!
//! [`StoreError`] is returned by every [`crate::EventStore`] backend.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Normalization errors
// ---------------------------------------------------------------------------

/// A recognised event type whose payload is missing or mistypes a required field.
#[derive(Debug, Error)]
pub enum InvalidPayload {
    /// The payload is not a JSON object.
    #[error("{event_type} payload is not a JSON object")]
    NotAnObject {
        /// The event type the payload was delivered under.
        event_type: &'static str,
    },

    /// A required field is absent, has the wrong type, or is an empty string.
    #[error("malformed {event_type} payload: {source}")]
    Malformed {
        /// The event type the payload was delivered under.
        event_type: &'static str,
        source: serde_json::Error,
    },

    /// The pushed ref has no final path segment to use as a branch name
    /// (e.g. `"refs/heads/"`).
    #[error("push ref '{git_ref}' does not name a branch")]
    RefWithoutBranch {
        /// The raw `ref` value from the payload.
        git_ref: String,
    },
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Failures reported by an [`crate::EventStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot currently serve requests.
    #[error("event store unavailable: {message}")]
    Unavailable {
        /// Description of why the store is unavailable.
        message: String,
    },

    /// Reading from or writing to the backing medium failed.
    #[error("event store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded for storage.
    #[error("event could not be serialised: {0}")]
    Serialization(#[from] serde_json::Error),
}
