use crate::document::Document;
use crate::engine::QueryEngine;
use crate::errors::QueryError;
use crate::query::RawRequest;

pub enum Command {
    Find { request: Option<String>, lean: bool },
    FindOne { request: Option<String>, lean: bool },
    FindById { id: String, request: Option<String>, lean: bool },
}

fn parse_request(raw: Option<&str>) -> Result<Option<RawRequest>, QueryError> {
    raw.map(RawRequest::from_json_str).transpose()
}

fn single_to_json(doc: Option<Document>) -> serde_json::Value {
    doc.as_ref().map_or(serde_json::Value::Null, Document::to_json)
}

/// Runs one read and returns the response body: `{data, count}` for `find`,
/// a document or `null` for the single lookups.
///
/// # Errors
/// Whatever the engine rejects, plus request text that is not a JSON object.
pub async fn run(
    engine: &QueryEngine,
    cmd: Command,
    credential: Option<&str>,
) -> Result<serde_json::Value, QueryError> {
    match cmd {
        Command::Find { request, lean } => {
            let page = engine.find(parse_request(request.as_deref())?, lean, credential).await?;
            Ok(page.to_json())
        }
        Command::FindOne { request, lean } => {
            let doc = engine.find_one(parse_request(request.as_deref())?, lean, credential).await?;
            Ok(single_to_json(doc))
        }
        Command::FindById { id, request, lean } => {
            let doc = engine
                .find_by_id(&id, parse_request(request.as_deref())?, lean, credential)
                .await?;
            Ok(single_to_json(doc))
        }
    }
}
