//! The per-collection query engine.
//!
//! Every read goes through the same pipeline: normalize the raw request,
//! build the storage projection, execute against the [`DocumentStore`],
//! then redact the results for the caller. Validation failures are raised
//! before the store is touched.

use crate::auth::Authorizer;
use crate::config::{EngineConfig, WildcardPolicy};
use crate::document::Document;
use crate::errors::QueryError;
use crate::query::{
    FieldSpec, FindPage, RawRequest, RequestKind, RequestSpec, build_projection,
    contains_restricted_operator, normalize, redact_documents, removal_set, telemetry,
};
use crate::store::{DocumentStore, FindManyQuery, ReadOptions};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::sync::Arc;
use std::time::Instant;

/// Built once per collection and shared; holds no per-request state.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn DocumentStore>,
    authorizer: Arc<dyn Authorizer>,
    config: EngineConfig,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("collection", &self.store.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        authorizer: Arc<dyn Authorizer>,
        config: EngineConfig,
    ) -> Self {
        Self { store, authorizer, config }
    }

    /// Like [`QueryEngine::new`] but rejects an unusable configuration.
    ///
    /// # Errors
    /// [`QueryError::Config`] from [`EngineConfig::validate`].
    pub fn try_new(
        store: Arc<dyn DocumentStore>,
        authorizer: Arc<dyn Authorizer>,
        config: EngineConfig,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        Ok(Self::new(store, authorizer, config))
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        self.store.name()
    }

    /// Normalizes a raw request for the given kind of read.
    ///
    /// # Errors
    /// See [`normalize`].
    pub fn verify_request(
        &self,
        raw: Option<RawRequest>,
        kind: RequestKind,
    ) -> Result<RequestSpec, QueryError> {
        normalize(raw, kind, &self.config, self.store.name())
    }

    /// Storage projection for a normalized request.
    #[must_use]
    pub fn build_projection(&self, spec: &RequestSpec) -> BsonDocument {
        let sort = (!spec.sort.is_empty()).then_some(&spec.sort);
        build_projection(
            &spec.fields,
            sort,
            &self.config.default_fields,
            &self.config.restricted_fields,
        )
    }

    #[must_use]
    pub fn contains_restricted_operator(&self, filter: &BsonDocument) -> bool {
        contains_restricted_operator(filter, &self.config.restricted_operators)
    }

    /// Strips the caller's removal set from `docs`. Returns the number of fields removed.
    pub fn redact(&self, docs: &mut [Document], fields: &FieldSpec, privileged: bool) -> usize {
        if docs.is_empty() {
            return 0;
        }
        if fields.is_wildcard() {
            if !privileged {
                log::warn!(
                    target: telemetry::AUDIT_TARGET,
                    "{}: wildcard projection requested by non-privileged caller (policy {:?})",
                    self.store.name(),
                    self.config.wildcard_policy
                );
            }
            if self.config.wildcard_policy == WildcardPolicy::Bypass {
                return 0;
            }
        }
        let paths = removal_set(fields, &self.config.restricted_fields, privileged);
        let removed = redact_documents(docs, &paths);
        telemetry::record_redactions(removed);
        removed
    }

    /// A page of matching documents and the total match count.
    ///
    /// The count ignores `limit` and `skip`. Both reads use the same filter
    /// and run concurrently. A limit of `0` only counts.
    ///
    /// # Errors
    /// Validation errors before any storage call; store faults unchanged.
    pub async fn find(
        &self,
        request: Option<RawRequest>,
        lean: bool,
        credential: Option<&str>,
    ) -> Result<FindPage, QueryError> {
        let started = Instant::now();
        let spec = self.checked(request, RequestKind::Find)?;
        let query = FindManyQuery {
            filter: spec.filter.clone(),
            sort: spec.sort.to_document(),
            skip: u64::try_from(spec.skip).unwrap_or(u64::MAX),
            limit: u64::try_from(spec.limit).unwrap_or(u64::MAX),
            options: self.read_options(&spec, lean),
        };
        let (count, mut data) = if spec.limit == 0 {
            (self.store.count(&query.filter).await?, Vec::new())
        } else {
            tokio::try_join!(self.store.count(&query.filter), self.store.find_many(&query))?
        };
        let privileged = self.authorizer.is_privileged(credential);
        self.redact(&mut data, &spec.fields, privileged);
        telemetry::log_query(
            self.store.name(),
            RequestKind::Find.as_str(),
            started.elapsed().as_millis(),
            data.len(),
            Some(count),
        );
        Ok(FindPage { data, count })
    }

    /// The first document matching a non-empty filter, if any.
    ///
    /// # Errors
    /// [`QueryError::RequestMissing`], [`QueryError::FilterMissing`],
    /// [`QueryError::RestrictedOperatorUsed`] or a store fault.
    pub async fn find_one(
        &self,
        request: Option<RawRequest>,
        lean: bool,
        credential: Option<&str>,
    ) -> Result<Option<Document>, QueryError> {
        let started = Instant::now();
        let kind = RequestKind::FindOne;
        let Some(raw) = request else {
            return Err(self.rejected(kind, QueryError::RequestMissing));
        };
        if !raw.payload().has_filter_criteria() {
            return Err(self.rejected(kind, QueryError::FilterMissing));
        }
        let spec = self.checked(Some(raw), kind)?;
        let found = self.store.find_one(&spec.filter, &self.read_options(&spec, lean)).await?;
        Ok(self.finish_single(kind, found, &spec, credential, started))
    }

    /// Looks a document up by identifier. Any filter in `request` is ignored.
    ///
    /// # Errors
    /// [`QueryError::InvalidIdentifier`] unless `id` is 24 hex digits; store faults unchanged.
    pub async fn find_by_id(
        &self,
        id: &str,
        request: Option<RawRequest>,
        lean: bool,
        credential: Option<&str>,
    ) -> Result<Option<Document>, QueryError> {
        let started = Instant::now();
        let kind = RequestKind::FindById;
        let id = DocumentId::parse(id).map_err(|e| self.rejected(kind, e))?;
        let spec = self.checked(request, kind)?;
        let found = self.store.find_by_id(&id, &self.read_options(&spec, lean)).await?;
        Ok(self.finish_single(kind, found, &spec, credential, started))
    }

    fn read_options(&self, spec: &RequestSpec, lean: bool) -> ReadOptions {
        ReadOptions { projection: self.build_projection(spec), populate: spec.populate.clone(), lean }
    }

    fn checked(&self, raw: Option<RawRequest>, kind: RequestKind) -> Result<RequestSpec, QueryError> {
        self.verify_request(raw, kind).map_err(|e| match e {
            // already audited with the offending operator
            restricted @ QueryError::RestrictedOperatorUsed(_) => restricted,
            other => self.rejected(kind, other),
        })
    }

    fn rejected(&self, kind: RequestKind, err: QueryError) -> QueryError {
        telemetry::log_rejected(self.store.name(), kind.as_str(), err.kind());
        err
    }

    fn finish_single(
        &self,
        kind: RequestKind,
        found: Option<Document>,
        spec: &RequestSpec,
        credential: Option<&str>,
        started: Instant,
    ) -> Option<Document> {
        let mut docs: Vec<Document> = found.into_iter().collect();
        if !docs.is_empty() {
            let privileged = self.authorizer.is_privileged(credential);
            self.redact(&mut docs, &spec.fields, privileged);
        }
        telemetry::log_query(
            self.store.name(),
            kind.as_str(),
            started.elapsed().as_millis(),
            docs.len(),
            None,
        );
        docs.pop()
    }
}
