pub mod auth;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod query;
pub mod store;
pub mod types;
pub mod utils;

mod test_support;

pub use auth::{Authorizer, NoPrivilege, StaticTokenAuthorizer};
pub use config::{DefaultField, EngineConfig, WildcardPolicy};
pub use document::{Document, Metadata, Record};
pub use engine::QueryEngine;
pub use errors::{QueryError, StoreError};
pub use query::{FindPage, RawRequest, RequestKind, RequestSpec};
pub use store::{DocumentStore, FindManyQuery, MemoryCollection, ReadOptions};
pub use types::DocumentId;

/// Initializes logging from `log4rs.yaml` when present.
///
/// Call once at start-up; [`logger::configure_logging`] gives programmatic control.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
