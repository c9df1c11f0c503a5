use crate::errors::QueryError;
use bson::Document as BsonDocument;

/// Converts a JSON object into a BSON document. Extended JSON markers such as
/// `{"$oid": ..}` are honoured.
///
/// # Errors
/// [`QueryError::MalformedRequest`] when the value is not an object or cannot be represented.
pub fn json_value_to_bson_document(val: &serde_json::Value) -> Result<BsonDocument, QueryError> {
    let obj = val
        .as_object()
        .ok_or_else(|| QueryError::MalformedRequest("expected JSON object".into()))?;
    BsonDocument::try_from(obj.clone()).map_err(|e| QueryError::MalformedRequest(e.to_string()))
}

/// Parses one JSON object into a BSON document.
///
/// # Errors
/// [`QueryError::Json`] for invalid JSON, otherwise as [`json_value_to_bson_document`].
pub fn parse_json_to_bson_document(json: &str) -> Result<BsonDocument, QueryError> {
    let val: serde_json::Value = serde_json::from_str(json)?;
    json_value_to_bson_document(&val)
}
