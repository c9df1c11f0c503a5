use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self { created_at: now, updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored document together with the bookkeeping the store keeps for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Record {
    /// Wraps `data`, assigning a fresh `_id` when it has none.
    #[must_use]
    pub fn new(mut data: BsonDocument) -> Self {
        if !data.contains_key("_id") {
            let mut with_id = BsonDocument::new();
            with_id.insert("_id", DocumentId::new().0);
            for (k, v) in data {
                with_id.insert(k, v);
            }
            data = with_id;
        }
        Self { data, metadata: Metadata::new() }
    }

    #[must_use]
    pub fn id(&self) -> Option<DocumentId> {
        self.data.get_object_id("_id").ok().map(DocumentId)
    }
}

/// A document returned by a read.
///
/// `Lean` is the plain data form; `Hydrated` also carries store metadata.
/// Both expose the same field tree through [`Document::data`] and
/// [`Document::data_mut`], so field-level processing never has to care which
/// form it was handed.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Lean(BsonDocument),
    Hydrated(Record),
}

impl Document {
    #[must_use]
    pub fn data(&self) -> &BsonDocument {
        match self {
            Self::Lean(d) => d,
            Self::Hydrated(r) => &r.data,
        }
    }

    pub fn data_mut(&mut self) -> &mut BsonDocument {
        match self {
            Self::Lean(d) => d,
            Self::Hydrated(r) => &mut r.data,
        }
    }

    #[must_use]
    pub fn into_data(self) -> BsonDocument {
        match self {
            Self::Lean(d) => d,
            Self::Hydrated(r) => r.data,
        }
    }

    #[must_use]
    pub fn is_lean(&self) -> bool {
        matches!(self, Self::Lean(_))
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Lean(_) => None,
            Self::Hydrated(r) => Some(&r.metadata),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<DocumentId> {
        self.data().get_object_id("_id").ok().map(DocumentId)
    }

    /// Looks up a dot-notation path, descending through embedded documents only.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Bson> {
        let mut cur = self.data();
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            let v = cur.get(part)?;
            if parts.peek().is_none() {
                return Some(v);
            }
            match v {
                Bson::Document(d) => cur = d,
                _ => return None,
            }
        }
        None
    }

    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    /// Relaxed extended JSON rendering of the field tree.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Bson::Document(self.data().clone()).into_relaxed_extjson()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data().serialize(serializer)
    }
}
