//! Identifiers for changeover entities.
//!
//! Identifiers are plain strings on the wire so that hand-written
//! configurations (`"op1"`, `"p1_op2"`) stay readable. Freshly generated ids
//! carry a short prefix followed by a lowercase ULID.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh identifier.
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, Ulid::new().to_string().to_lowercase()))
            }

            /// Borrow as `&str`.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is blank.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }
    };
}

string_id!(
    /// Unique identifier for an operator.
    OperatorId,
    "op"
);

string_id!(
    /// Unique identifier for a phase.
    PhaseId,
    "phase"
);

string_id!(
    /// Unique identifier for an operation (unique within a configuration).
    OperationId,
    "step"
);
