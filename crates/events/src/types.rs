//! Normalized event records and the value types they are built from.
//!
//! A [`NormalizedEvent`] is only ever produced by [`crate::normalize`]; every
//! field is populated at construction and the record is never mutated after.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuthorName, BranchName, EventId};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialises as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Event classification
// ---------------------------------------------------------------------------

/// The classified kind of a normalized event.
///
/// This is never the raw `X-GitHub-Event` value: a `pull_request` delivery can
/// become either [`EventAction::PullRequest`] or [`EventAction::Merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Commits were pushed to a branch.
    Push,
    /// A pull request was opened.
    PullRequest,
    /// A pull request was closed with its changes merged.
    Merge,
}

impl EventAction {
    /// Returns the wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Push => "push",
            EventAction::PullRequest => "pull_request",
            EventAction::Merge => "merge",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A webhook delivery reduced to the common schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// What happened.
    pub action: EventAction,

    /// Who triggered it.
    pub author: AuthorName,

    /// Source branch of a pull request. `None` for pushes.
    pub from_branch: Option<BranchName>,

    /// Branch that received the push, or the pull request's base branch.
    pub to_branch: BranchName,

    /// When the delivery was processed (server clock, not the payload's clock).
    pub timestamp: Timestamp,
}

/// A [`NormalizedEvent`] together with the identifier its store assigned.
///
/// Serialises flat: `{"id": "...", "action": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Store-assigned identifier.
    pub id: EventId,

    #[serde(flatten)]
    pub event: NormalizedEvent,
}

impl StoredEvent {
    pub fn new(id: EventId, event: NormalizedEvent) -> Self {
        Self { id, event }
    }
}
