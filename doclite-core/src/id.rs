//! Opaque document identifiers.
//!
//! Identifiers are random v4 UUIDs: collision-resistant, assigned exactly
//! once at document creation, and never reused within a collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// The unique identifier of a stored document.
///
/// On disk the identifier is the collection key (a hyphenated hex string);
/// in memory it is synthesized into the `_id` field of documents returned
/// from lookups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] if the input is not a valid UUID.
    pub fn parse(input: &str) -> StoreResult<Self> {
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| StoreError::InvalidId(input.to_string()))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_round_trips_display() {
        let id = DocumentId::new();
        let parsed = DocumentId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        let err = DocumentId::parse("not-a-uuid").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }
}
