use crate::errors::QueryError;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;

use super::types::{FieldRule, FieldSpec, SortKey, SortSpec, WILDCARD};

/// Client-supplied request, exactly as received. Nothing here is trusted.
///
/// Some clients send the payload one level deeper under `PostBody`; the
/// normalizer unwraps that envelope once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub filter: Option<Bson>,
    #[serde(default)]
    pub structure: Option<Bson>,
    #[serde(default)]
    pub populate: Option<Bson>,
    #[serde(default)]
    pub sort: Option<Bson>,
    #[serde(default)]
    pub limit: Option<Bson>,
    #[serde(default)]
    pub skip: Option<Bson>,
    #[serde(default)]
    pub page: Option<Bson>,
    #[serde(default, rename = "PostBody", skip_serializing_if = "Option::is_none")]
    pub post_body: Option<Box<RawRequest>>,
}

impl RawRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns an error if the text is not JSON or not a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, QueryError> {
        let val: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(val)
    }

    /// # Errors
    /// Returns an error if the value is not an object or a field has an unusable shape.
    pub fn from_json_value(val: serde_json::Value) -> Result<Self, QueryError> {
        let mut val = val;
        let Some(obj) = val.as_object_mut() else {
            return Err(QueryError::MalformedRequest("request must be a JSON object".into()));
        };
        keep_wide_window_values(obj);
        serde_json::from_value(val).map_err(|e| QueryError::MalformedRequest(e.to_string()))
    }

    #[must_use]
    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.filter = Some(Bson::Document(filter));
        self
    }

    #[must_use]
    pub fn structure(mut self, structure: impl Into<Bson>) -> Self {
        self.structure = Some(structure.into());
        self
    }

    #[must_use]
    pub fn populate(mut self, populate: impl Into<Bson>) -> Self {
        self.populate = Some(populate.into());
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: BsonDocument) -> Self {
        self.sort = Some(Bson::Document(sort));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: impl Into<Bson>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: impl Into<Bson>) -> Self {
        self.skip = Some(skip.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: impl Into<Bson>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Wraps this request under the `PostBody` envelope.
    #[must_use]
    pub fn enveloped(self) -> Self {
        Self { post_body: Some(Box::new(self)), ..Self::default() }
    }

    /// Returns the request the client actually meant: the `PostBody` payload if present.
    #[must_use]
    pub fn unwrap_envelope(self) -> Self {
        match self.post_body {
            Some(inner) => *inner,
            None => self,
        }
    }

    /// Borrowing counterpart of [`RawRequest::unwrap_envelope`].
    #[must_use]
    pub fn payload(&self) -> &RawRequest {
        self.post_body.as_deref().unwrap_or(self)
    }

    /// True when a filter is present and has at least one criterion.
    #[must_use]
    pub fn has_filter_criteria(&self) -> bool {
        matches!(&self.filter, Some(Bson::Document(d)) if !d.is_empty())
    }
}

const WINDOW_KEYS: [&str; 3] = ["limit", "skip", "page"];

/// BSON has no unsigned 64-bit type. Window values above `i64::MAX` are kept
/// as numeric strings so they clamp instead of failing deserialization.
fn keep_wide_window_values(obj: &mut serde_json::Map<String, serde_json::Value>) {
    for key in WINDOW_KEYS {
        let Some(v) = obj.get_mut(key) else { continue };
        if let Some(n) = v.as_u64().filter(|n| i64::try_from(*n).is_err()) {
            *v = serde_json::Value::String(n.to_string());
        }
    }
    if let Some(serde_json::Value::Object(inner)) = obj.get_mut("PostBody") {
        keep_wide_window_values(inner);
    }
}

/// Reads an integer out of a loosely typed value: numbers with no fractional
/// part and numeric strings. Anything else is `None`.
#[must_use]
pub fn integer_like(v: &Bson) -> Option<i64> {
    match v {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) => whole_f64(*f),
        Bson::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return None;
            }
            match t.parse::<i64>() {
                Ok(i) => Some(i),
                Err(e) => match e.kind() {
                    IntErrorKind::PosOverflow => Some(i64::MAX),
                    IntErrorKind::NegOverflow => Some(i64::MIN),
                    _ => t.parse::<f64>().ok().and_then(whole_f64),
                },
            }
        }
        _ => None,
    }
}

/// Whole, finite numbers only. Values outside the `i64` range saturate.
#[allow(clippy::cast_possible_truncation)]
fn whole_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 { Some(f as i64) } else { None }
}

#[must_use]
pub(crate) fn non_negative(i: i64) -> usize {
    usize::try_from(i.max(0)).unwrap_or(usize::MAX)
}

/// # Errors
/// A filter that is present but not a document is rejected.
pub fn parse_filter(raw: Option<Bson>) -> Result<BsonDocument, QueryError> {
    match raw {
        None | Some(Bson::Null) => Ok(BsonDocument::new()),
        Some(Bson::Document(d)) => Ok(d),
        Some(other) => Err(QueryError::MalformedRequest(format!(
            "filter must be a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Parses the requested shape.
///
/// Accepts the wildcard marker, a document of `field -> 1 | 0 | {"$meta": ..}`,
/// a space separated string (`"name -secret"`) or an array of field names.
///
/// # Errors
/// Rejects values of any other type.
pub fn parse_fields(raw: Option<Bson>) -> Result<FieldSpec, QueryError> {
    let rules = match raw {
        None | Some(Bson::Null) => Vec::new(),
        Some(Bson::String(s)) if s.trim() == WILDCARD => return Ok(FieldSpec::Wildcard),
        Some(Bson::String(s)) => s
            .split_whitespace()
            .map(|tok| match tok.strip_prefix('-') {
                Some(field) => (field.to_string(), FieldRule::Exclude),
                None => (tok.to_string(), FieldRule::Include),
            })
            .filter(|(k, _)| !k.is_empty())
            .collect(),
        Some(Bson::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) if !s.is_empty() => Some((s, FieldRule::Include)),
                _ => None,
            })
            .collect(),
        Some(Bson::Document(d)) => {
            let mut rules = Vec::with_capacity(d.len());
            for (k, v) in d {
                match field_rule(&v) {
                    Some(rule) => rules.push((k, rule)),
                    None => log::debug!("ignoring projection entry {k} with unusable value"),
                }
            }
            rules
        }
        Some(other) => {
            return Err(QueryError::MalformedRequest(format!(
                "structure must be a document, a string or an array, got {:?}",
                other.element_type()
            )));
        }
    };
    Ok(FieldSpec::Fields(rules))
}

fn field_rule(v: &Bson) -> Option<FieldRule> {
    match v {
        Bson::Boolean(true) => Some(FieldRule::Include),
        Bson::Boolean(false) => Some(FieldRule::Exclude),
        Bson::Document(d) if d.contains_key("$meta") => Some(FieldRule::Relevance(d.clone())),
        other => match integer_like(other) {
            Some(1) => Some(FieldRule::Include),
            Some(0) => Some(FieldRule::Exclude),
            _ => None,
        },
    }
}

/// Parses a sort description: a document of `field -> 1 | -1 | "asc" | "desc" |
/// {"$meta": ..}` or a space separated string (`"name -createdAt"`).
///
/// # Errors
/// Rejects values of any other type. Unusable directions are dropped.
pub fn parse_sort(raw: Option<Bson>) -> Result<SortSpec, QueryError> {
    match raw {
        None | Some(Bson::Null) => Ok(SortSpec::default()),
        Some(Bson::String(s)) => Ok(SortSpec(
            s.split_whitespace()
                .filter_map(|tok| match tok.strip_prefix('-') {
                    Some("") => None,
                    Some(field) => Some((field.to_string(), SortKey::Desc)),
                    None => Some((tok.to_string(), SortKey::Asc)),
                })
                .collect(),
        )),
        Some(Bson::Document(d)) => {
            let mut keys = Vec::with_capacity(d.len());
            for (field, v) in d {
                match sort_key(&v) {
                    Some(key) => keys.push((field, key)),
                    None => log::debug!("ignoring sort entry {field} with unusable direction"),
                }
            }
            Ok(SortSpec(keys))
        }
        Some(other) => Err(QueryError::MalformedRequest(format!(
            "sort must be a document or a string, got {:?}",
            other.element_type()
        ))),
    }
}

fn sort_key(v: &Bson) -> Option<SortKey> {
    match v {
        Bson::Document(d) if d.contains_key("$meta") => Some(SortKey::Relevance(d.clone())),
        Bson::String(s) => match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortKey::Asc),
            "desc" | "descending" => Some(SortKey::Desc),
            other => match other.parse::<i64>() {
                Ok(i) if i > 0 => Some(SortKey::Asc),
                Ok(i) if i < 0 => Some(SortKey::Desc),
                _ => None,
            },
        },
        other => match integer_like(other) {
            Some(i) if i > 0 => Some(SortKey::Asc),
            Some(i) if i < 0 => Some(SortKey::Desc),
            _ => None,
        },
    }
}

/// Parses relation names: a space separated string, an array of names, or an
/// array of `{ "path": name }` documents.
///
/// # Errors
/// Rejects values of any other type.
pub fn parse_populate(raw: Option<Bson>) -> Result<Vec<String>, QueryError> {
    match raw {
        None | Some(Bson::Null) => Ok(Vec::new()),
        Some(Bson::String(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(Bson::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) if !s.is_empty() => Some(s),
                Bson::Document(d) => d.get_str("path").ok().map(str::to_string),
                _ => None,
            })
            .collect()),
        Some(other) => Err(QueryError::MalformedRequest(format!(
            "populate must be a string or an array, got {:?}",
            other.element_type()
        ))),
    }
}
