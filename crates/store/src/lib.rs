//! hookfeed storage backends.
//!
//! Implements the [`events::EventStore`] trait with two backends:
//!
//! - [`InMemoryEventStore`]: records live for the lifetime of the process.
//!   Used in tests and for throwaway local runs.
//! - [`JsonlEventStore`]: appends one JSON object per line to a file, so the
//!   event feed survives restarts.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. The
//! ingestion service sees only [`events::EventStore`].

mod jsonl;
mod memory;

pub use jsonl::JsonlEventStore;
pub use memory::InMemoryEventStore;
