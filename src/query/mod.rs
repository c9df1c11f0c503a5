// Telemetry is a submodule of query
pub mod telemetry;

// Submodules for separation of concerns
mod guard;
mod normalize;
mod parse;
mod projection;
mod redact;
mod types;

// Public API re-exports
pub use guard::{contains_restricted_operator, find_restricted_operator};
pub use normalize::{effective_limit, effective_page, normalize};
pub use parse::{RawRequest, integer_like, parse_fields, parse_filter, parse_populate, parse_sort};
pub use projection::{build_projection, is_restricted};
pub use redact::{redact_document, redact_documents, removal_set, remove_path};
pub use types::{
    FieldRule, FieldSpec, FindPage, MAX_REDACTION_DEPTH, RequestKind, RequestSpec, SortKey,
    SortSpec, WILDCARD,
};
pub(crate) use types::DEFAULT_MAX_LIMIT;
