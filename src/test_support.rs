#![cfg(test)]

// Test-only store doubles
use crate::document::Document;
use crate::errors::StoreError;
use crate::store::{DocumentStore, FindManyQuery, ReadOptions};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A store that records how often it was called and never finds anything.
#[derive(Default)]
pub struct CountingStore {
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DocumentStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn count(&self, _filter: &BsonDocument) -> Result<u64, StoreError> {
        self.hit();
        Ok(0)
    }

    async fn find_many(&self, _query: &FindManyQuery) -> Result<Vec<Document>, StoreError> {
        self.hit();
        Ok(Vec::new())
    }

    async fn find_one(
        &self,
        _filter: &BsonDocument,
        _options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        Ok(None)
    }

    async fn find_by_id(
        &self,
        _id: &DocumentId,
        _options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        Ok(None)
    }
}
