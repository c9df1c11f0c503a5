use async_trait::async_trait;
use bson::{Document as BsonDocument, doc};
use querygate::{
    Document, DocumentId, DocumentStore, EngineConfig, FindManyQuery, MemoryCollection,
    QueryEngine, ReadOptions, StaticTokenAuthorizer, StoreError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ADMIN: &str = "Bearer admin-token";

/// Forwards to an inner store and counts every call. Can be told to fail.
pub struct RecordingStore {
    inner: MemoryCollection,
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingStore {
    pub fn new(inner: MemoryCollection) -> Self {
        Self { inner, calls: AtomicUsize::new(0), fail: false }
    }

    pub fn failing() -> Self {
        Self { inner: MemoryCollection::new("down"), calls: AtomicUsize::new(0), fail: true }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail { Err(StoreError::Unavailable) } else { Ok(()) }
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn count(&self, filter: &BsonDocument) -> Result<u64, StoreError> {
        self.hit()?;
        self.inner.count(filter).await
    }

    async fn find_many(&self, query: &FindManyQuery) -> Result<Vec<Document>, StoreError> {
        self.hit()?;
        self.inner.find_many(query).await
    }

    async fn find_one(
        &self,
        filter: &BsonDocument,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        self.hit()?;
        self.inner.find_one(filter, options).await
    }

    async fn find_by_id(
        &self,
        id: &DocumentId,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        self.hit()?;
        self.inner.find_by_id(id, options).await
    }
}

/// 120 `code: "abc"` documents numbered by `n`, plus a handful of others.
pub fn products() -> MemoryCollection {
    let c = MemoryCollection::new("products");
    for n in 0..120 {
        c.insert(doc! {
            "code": "abc",
            "n": n,
            "name": format!("product {n}"),
            "secret": format!("secret-{n}"),
            "owner": {"name": "ana", "email": "ana@example.com", "auth": {"hash": "x", "salt": "y"}},
            "history": [{"by": "ana", "ip": "10.0.0.1"}, {"by": "bo", "ip": "10.0.0.2"}],
        });
    }
    for code in ["xyz", "X1", "X2"] {
        c.insert(doc! {"code": code, "n": 500, "secret": "other", "owner": {"email": "o@example.com"}});
    }
    c
}

pub fn restricted_config() -> EngineConfig {
    EngineConfig::default()
        .with_restricted_fields(["secret", "owner.email", "owner.auth.hash", "history.ip"])
        .with_max_limit(50)
}

pub fn engine_over(store: Arc<dyn DocumentStore>, config: EngineConfig) -> QueryEngine {
    QueryEngine::new(store, Arc::new(StaticTokenAuthorizer::new(["admin-token"])), config)
}

pub fn product_engine() -> QueryEngine {
    engine_over(Arc::new(products()), restricted_config())
}
