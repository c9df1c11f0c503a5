use super::eval::{self, compare_docs, project, text_search};
use super::{DocumentStore, FindManyQuery, ReadOptions};
use crate::document::{Document, Record};
use crate::errors::StoreError;
use crate::types::DocumentId;
use crate::utils::json::parse_json_to_bson_document;
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

/// An in-process collection of records.
///
/// Relations registered with [`MemoryCollection::with_relation`] let reads
/// expand reference fields (an `ObjectId` or an array of them) into the
/// referenced documents.
pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Record>>,
    relations: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl std::fmt::Debug for MemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("relations", &self.relations.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), docs: RwLock::new(Vec::new()), relations: RwLock::new(HashMap::new()) }
    }

    /// Stores `data`, assigning an `_id` if it has none, and returns the id.
    pub fn insert(&self, data: BsonDocument) -> Option<DocumentId> {
        let record = Record::new(data);
        let id = record.id();
        self.docs.write().push(record);
        id
    }

    /// Loads one JSON object per line. Blank lines are skipped.
    ///
    /// # Errors
    /// [`StoreError::Backend`] on I/O failures or lines that are not JSON objects.
    pub fn load_ndjson<R: BufRead>(&self, reader: R) -> Result<usize, StoreError> {
        let mut loaded = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| StoreError::Backend(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc = parse_json_to_bson_document(&line)
                .map_err(|e| StoreError::Backend(format!("line {}: {e}", n + 1)))?;
            loaded.push(Record::new(doc));
        }
        let count = loaded.len();
        self.docs.write().extend(loaded);
        log::info!("{}: loaded {count} documents", self.name);
        Ok(count)
    }

    /// Registers `field` as a reference into `target`.
    #[must_use]
    pub fn with_relation(self, field: impl Into<String>, target: Arc<MemoryCollection>) -> Self {
        self.relations.write().insert(field.into(), target);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    fn get_lean(&self, id: &bson::oid::ObjectId) -> Option<BsonDocument> {
        self.docs.read().iter().find(|r| r.data.get_object_id("_id").ok().as_ref() == Some(id)).map(|r| r.data.clone())
    }

    /// Matching records with their relevance scores, in storage order.
    fn select(&self, filter: &BsonDocument) -> Result<Vec<(Record, f64)>, StoreError> {
        let search = text_search(filter);
        let docs = self.docs.read();
        let mut out = Vec::new();
        for r in docs.iter() {
            if eval::matches(&r.data, filter)? {
                let score = search.map_or(0.0, |s| eval::text_score(&r.data, s));
                out.push((r.clone(), score));
            }
        }
        Ok(out)
    }

    fn render(&self, record: Record, score: f64, options: &ReadOptions) -> Result<Document, StoreError> {
        let mut data = project(&record.data, &options.projection, score);
        self.populate(&mut data, &options.populate)?;
        Ok(if options.lean { Document::Lean(data) } else { Document::Hydrated(Record { data, metadata: record.metadata }) })
    }

    fn populate(&self, data: &mut BsonDocument, fields: &[String]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let relations = self.relations.read();
        for field in fields {
            let target = relations.get(field).ok_or_else(|| StoreError::UnknownRelation(field.clone()))?;
            let expanded = match data.get(field) {
                Some(Bson::ObjectId(id)) => target.get_lean(id).map_or(Bson::Null, Bson::Document),
                Some(Bson::Array(items)) => Bson::Array(
                    items
                        .iter()
                        .filter_map(|i| match i {
                            Bson::ObjectId(id) => target.get_lean(id).map(Bson::Document),
                            other => Some(other.clone()),
                        })
                        .collect(),
                ),
                _ => continue,
            };
            data.insert(field.clone(), expanded);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn count(&self, filter: &BsonDocument) -> Result<u64, StoreError> {
        let docs = self.docs.read();
        let mut n = 0u64;
        for r in docs.iter() {
            if eval::matches(&r.data, filter)? {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn find_many(&self, query: &FindManyQuery) -> Result<Vec<Document>, StoreError> {
        let mut hits = self.select(&query.filter)?;
        if !query.sort.is_empty() {
            hits.sort_by(|a, b| compare_docs((&a.0.data, a.1), (&b.0.data, b.1), &query.sort));
        }
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        hits.into_iter()
            .skip(skip)
            .take(limit)
            .map(|(r, score)| self.render(r, score, &query.options))
            .collect()
    }

    async fn find_one(
        &self,
        filter: &BsonDocument,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        let Some((record, score)) = self.select(filter)?.into_iter().next() else {
            return Ok(None);
        };
        self.render(record, score, options).map(Some)
    }

    async fn find_by_id(
        &self,
        id: &DocumentId,
        options: &ReadOptions,
    ) -> Result<Option<Document>, StoreError> {
        let record = self.docs.read().iter().find(|r| r.id().as_ref() == Some(id)).cloned();
        record.map(|r| self.render(r, 0.0, options)).transpose()
    }
}
