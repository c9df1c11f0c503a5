use crate::document::Document;
use bson::{Bson, Document as BsonDocument, doc};
use serde::Serialize;

/// Marker selecting every field of a document.
pub const WILDCARD: &str = "*";
/// Dot-notation depth honoured by redaction.
pub const MAX_REDACTION_DEPTH: usize = 3;
pub(crate) const DEFAULT_LIMIT: usize = 1;
pub(crate) const DEFAULT_MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Find,
    FindOne,
    FindById,
}

impl RequestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::FindOne => "findOne",
            Self::FindById => "findById",
        }
    }
}

/// What the caller asked for about a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    Include,
    Exclude,
    /// A computed relevance value, e.g. `{"$meta": "textScore"}`.
    Relevance(BsonDocument),
}

/// Canonical form of the requested document shape.
///
/// Read it through [`FieldSpec::inclusions`] when building the storage
/// projection and through [`FieldSpec::exclusions`] when redacting results.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Wildcard,
    Fields(Vec<(String, FieldRule)>),
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self::Fields(Vec::new())
    }
}

impl FieldSpec {
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    #[must_use]
    pub fn rules(&self) -> &[(String, FieldRule)] {
        match self {
            Self::Wildcard => &[],
            Self::Fields(rules) => rules,
        }
    }

    /// Entries that add a field to the projection (includes and relevance requests).
    pub fn inclusions(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules()
            .iter()
            .filter(|(_, r)| !matches!(r, FieldRule::Exclude))
            .map(|(k, r)| (k.as_str(), r))
    }

    /// Paths the caller asked to have removed from the result.
    pub fn exclusions(&self) -> impl Iterator<Item = &str> {
        self.rules()
            .iter()
            .filter(|(_, r)| matches!(r, FieldRule::Exclude))
            .map(|(k, _)| k.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Asc,
    Desc,
    Relevance(BsonDocument),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec(pub Vec<(String, SortKey)>);

impl SortSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Relevance markers requested by this sort, in order.
    pub fn relevance_entries(&self) -> impl Iterator<Item = (&str, &BsonDocument)> {
        self.0.iter().filter_map(|(k, v)| match v {
            SortKey::Relevance(meta) => Some((k.as_str(), meta)),
            _ => None,
        })
    }

    /// Storage-ready sort document (`1`, `-1` or the relevance marker).
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        for (field, key) in &self.0 {
            let v = match key {
                SortKey::Asc => Bson::Int32(1),
                SortKey::Desc => Bson::Int32(-1),
                SortKey::Relevance(meta) => Bson::Document(meta.clone()),
            };
            out.insert(field.clone(), v);
        }
        out
    }
}

/// A normalized read request. Only ever built by normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub filter: BsonDocument,
    pub limit: usize,
    pub skip: usize,
    pub page: Option<usize>,
    pub sort: SortSpec,
    pub fields: FieldSpec,
    pub populate: Vec<String>,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            filter: doc! {},
            limit: DEFAULT_LIMIT,
            skip: 0,
            page: None,
            sort: SortSpec::default(),
            fields: FieldSpec::default(),
            populate: Vec::new(),
        }
    }
}

/// Result of a paginated read: the page itself and the total match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FindPage {
    pub data: Vec<Document>,
    pub count: u64,
}

impl FindPage {
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "data": self.data.iter().map(Document::to_json).collect::<Vec<_>>(),
            "count": self.count,
        })
    }
}
