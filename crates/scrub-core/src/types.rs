//! Core types for Scrub
//!
//! Defines the values that flow through a scrub run:
//! - Record identifiers and stored records
//! - Pending updates produced by the transform policy
//! - Run identifiers for correlating reports

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque, unique and stable record identifier
///
/// Ordering is only used for keyset pagination; the engine never
/// interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a record id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// A stored row as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    pub id: RecordId,
    /// Serialized target field, absent when the column is null
    #[serde(rename = "field")]
    pub raw_field: Option<String>,
}

impl Record {
    /// Create a record with a present target field
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RecordId>, raw_field: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_field: Some(raw_field.into()),
        }
    }

    /// Create a record whose target field is null
    #[inline]
    #[must_use]
    pub fn null(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            raw_field: None,
        }
    }
}

/// Replacement value for one record's target field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    /// Record to update
    pub id: RecordId,
    /// Canonical, minimized serialization
    pub new_raw_field: String,
}

/// Identifier of a single `apply()`/`plan()` invocation (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_orders_lexically() {
        let mut ids = vec![RecordId::from("b"), RecordId::from("a"), RecordId::from("c")];
        ids.sort();
        assert_eq!(ids, vec![RecordId::from("a"), RecordId::from("b"), RecordId::from("c")]);
    }

    #[test]
    fn record_serializes_field_column() {
        let json = serde_json::to_string(&Record::null("4")).unwrap();
        assert_eq!(json, r#"{"id":"4","field":null}"#);

        let parsed: Record = serde_json::from_str(r#"{"id":"1","field":"{}"}"#).unwrap();
        assert_eq!(parsed, Record::new("1", "{}"));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
