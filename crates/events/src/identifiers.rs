//! Newtype domain identifiers.
//!
//! Branch names and authors are both strings on the wire, but they are never
//! interchangeable: a [`BranchName`] cannot be passed where an [`AuthorName`]
//! is expected. Both reject the empty string, so a record that holds one is
//! guaranteed to carry a usable value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a string identifier is constructed from an empty value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier must not be empty")]
pub struct EmptyIdentifier;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and a
// TryFrom<String> used by serde so stored values go through the same check.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyIdentifier)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// A Git branch name (e.g. `"main"`, `"feature-x"`).
    ///
    /// For push events this is the last `/`-delimited segment of the pushed ref.
    BranchName
}

string_id! {
    /// The platform login or display name of the actor that triggered an event.
    AuthorName
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (assigned by the store)
// ---------------------------------------------------------------------------

/// Identifies a stored event.
///
/// Assigned by the [`crate::EventStore`] on insert. Serialises as the
/// hyphenated UUID string, which is the form returned to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a new random event identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
