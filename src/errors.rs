use thiserror::Error;

/// Failures raised by the query engine.
///
/// Request-validation variants are produced before any storage call is made.
/// Storage faults are carried through unchanged in [`QueryError::Store`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request body is missing")]
    RequestMissing,

    #[error("request filter is missing or empty")]
    FilterMissing,

    #[error("operator restricted: {0}")]
    RestrictedOperatorUsed(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Stable, machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestMissing => "request_missing",
            Self::FilterMissing => "filter_missing",
            Self::RestrictedOperatorUsed(_) => "restricted_operator_used",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::MalformedRequest(_) => "malformed_request",
            Self::Json(_) => "json",
            Self::Config(_) => "config",
            Self::Store(_) => "store",
        }
    }
}

/// Failures reported by a [`crate::store::DocumentStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("storage unavailable")]
    Unavailable,
}
