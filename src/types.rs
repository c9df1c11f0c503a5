use crate::errors::QueryError;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a stored document, in the store's native `ObjectId` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub ObjectId);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parses a 24 hex digit identifier.
    ///
    /// # Errors
    /// Returns [`QueryError::InvalidIdentifier`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if !Self::is_valid(raw) {
            return Err(QueryError::InvalidIdentifier(raw.to_string()));
        }
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| QueryError::InvalidIdentifier(raw.to_string()))
    }

    #[must_use]
    pub fn is_valid(raw: &str) -> bool {
        raw.len() == 24 && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    #[must_use]
    pub fn as_object_id(&self) -> &ObjectId {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for DocumentId {
    type Err = QueryError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}
