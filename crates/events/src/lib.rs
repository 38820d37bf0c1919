//! Event domain for hookfeed.
//!
//! This crate owns the normalized record shape, the pure webhook normalizer, and
//! the [`EventStore`] port that storage backends implement. It performs no I/O;
//! infrastructure crates supply transport and persistence.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`EventId`, `BranchName`, `AuthorName`) |
//! | [`types`] | Record and value types (`NormalizedEvent`, `StoredEvent`, `Timestamp`) |
//! | [`normalizer`] | Webhook payload classification |
//! | [`store`] | The `EventStore` trait |
//! | [`errors`] | `InvalidPayload` and `StoreError` |

pub mod errors;
pub mod identifiers;
pub mod normalizer;
pub mod store;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{InvalidPayload, StoreError};
pub use identifiers::{AuthorName, BranchName, EmptyIdentifier, EventId};
pub use normalizer::{
    normalize, normalize_at, IgnoreReason, Normalization, PULL_REQUEST_EVENT, PUSH_EVENT,
};
pub use store::{newest_first, EventStore};
pub use types::{EventAction, NormalizedEvent, StoredEvent, Timestamp};

/// Number of records returned by a recent-events listing.
pub const RECENT_EVENTS_LIMIT: usize = 20;
