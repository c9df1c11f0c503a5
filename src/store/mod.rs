//! The storage collaborator the engine reads through.
//!
//! The engine hands a store a finished filter, projection, sort, window and
//! relation list; the store only executes. [`memory::MemoryCollection`] is the
//! in-process implementation used by the CLI and the tests.

mod eval;
pub mod memory;

pub use eval::{compare_bson, matches, text_score};
pub use memory::MemoryCollection;

use crate::document::Document;
use crate::errors::StoreError;
use crate::types::DocumentId;
use bson::Document as BsonDocument;

/// Read options shared by every lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Inclusion projection; empty means every field.
    pub projection: BsonDocument,
    /// Relation fields to expand.
    pub populate: Vec<String>,
    /// Return plain data instead of hydrated records.
    pub lean: bool,
}

/// A windowed multi-document read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyQuery {
    pub filter: BsonDocument,
    pub sort: BsonDocument,
    pub skip: u64,
    pub limit: u64,
    pub options: ReadOptions,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name, used for logging.
    fn name(&self) -> &str;

    async fn count(&self, filter: &BsonDocument) -> Result<u64, StoreError>;

    async fn find_many(&self, query: &FindManyQuery) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        filter: &BsonDocument,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError>;

    async fn find_by_id(
        &self,
        id: &DocumentId,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError>;
}
