//! Task identifiers.
//!
//! Identifiers are opaque strings, immutable once assigned. Fresh ids are
//! UUIDv4 in simple hex form; the distinguished root uses the literal
//! `"root"` so a store can synthesize it deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known identifier of the synthesized root task.
pub const ROOT_ID: &str = "root";

/// Globally unique, immutable task identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The identifier of the distinguished root task.
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    /// Wrap an existing identifier without validation.
    ///
    /// Intended for deserialization paths and tests; uniqueness is the
    /// caller's responsibility.
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the distinguished root identifier.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&TaskId> for TaskId {
    fn from(id: &TaskId) -> Self {
        id.clone()
    }
}
