use crate::config::DefaultField;
use bson::{Bson, Document as BsonDocument};

use super::types::{FieldRule, FieldSpec, SortSpec};

/// Builds the storage projection for a request.
///
/// The result is either empty (all fields) or an inclusion projection. When
/// all fields are selected and a sort is given, relevance entries coming from
/// the defaults and from the sort are still listed, since a scored field has
/// to be projected explicitly to be sortable.
///
/// Requested paths that are restricted, or sit under a restricted path, are
/// never added. Exclusions are not translated: they are applied on the
/// results by redaction.
#[must_use]
pub fn build_projection(
    fields: &FieldSpec,
    sort: Option<&SortSpec>,
    defaults: &[DefaultField],
    restricted: &[String],
) -> BsonDocument {
    let mut out = BsonDocument::new();
    let all_fields = matches!(defaults.first(), Some(DefaultField::Wildcard)) || fields.is_wildcard();
    if all_fields {
        if let Some(sort) = sort {
            for d in defaults {
                if let DefaultField::Relevance { field, meta } = d {
                    out.insert(field.clone(), relevance(meta));
                }
            }
            for (field, meta) in sort.relevance_entries() {
                out.insert(field, Bson::Document(meta.clone()));
            }
        }
        return out;
    }

    for d in defaults {
        match d {
            DefaultField::Wildcard => {}
            DefaultField::Field(f) => {
                out.insert(f.clone(), Bson::Int32(1));
            }
            DefaultField::Relevance { field, meta } => {
                out.insert(field.clone(), relevance(meta));
            }
        }
    }
    for (field, rule) in fields.inclusions() {
        if is_restricted(field, restricted) {
            log::debug!("dropping restricted field {field} from projection");
            continue;
        }
        match rule {
            FieldRule::Include => {
                out.insert(field, Bson::Int32(1));
            }
            FieldRule::Relevance(meta) => {
                out.insert(field, Bson::Document(meta.clone()));
            }
            FieldRule::Exclude => {}
        }
    }
    out
}

fn relevance(meta: &str) -> Bson {
    let mut d = BsonDocument::new();
    d.insert("$meta", meta);
    Bson::Document(d)
}

/// True if `path` equals a restricted path or lies beneath one.
#[must_use]
pub fn is_restricted(path: &str, restricted: &[String]) -> bool {
    restricted.iter().any(|r| {
        path == r || (path.len() > r.len() && path.starts_with(r.as_str()) && path.as_bytes()[r.len()] == b'.')
    })
}
