use crate::document::Document;
use bson::{Bson, Document as BsonDocument};

use super::types::{FieldSpec, MAX_REDACTION_DEPTH};

/// Paths to strip from a result.
///
/// Restricted paths apply to non-privileged callers only; paths the caller
/// excluded with `0` apply to everyone.
#[must_use]
pub fn removal_set(fields: &FieldSpec, restricted: &[String], privileged: bool) -> Vec<String> {
    let mut out: Vec<String> = if privileged { Vec::new() } else { restricted.to_vec() };
    for path in fields.exclusions() {
        if !out.iter().any(|p| p == path) {
            out.push(path.to_string());
        }
    }
    out
}

/// Removes every path in `paths` from each document. Returns how many fields were removed.
pub fn redact_documents(docs: &mut [Document], paths: &[String]) -> usize {
    if paths.is_empty() {
        return 0;
    }
    docs.iter_mut().map(|d| redact_document(d.data_mut(), paths)).sum()
}

pub fn redact_document(doc: &mut BsonDocument, paths: &[String]) -> usize {
    paths.iter().map(|p| remove_path(doc, p)).sum()
}

/// Deletes a dot-notation path of at most three segments.
///
/// Walks embedded documents and the document elements of arrays. Missing
/// intermediates and deeper paths are left alone.
pub fn remove_path(doc: &mut BsonDocument, path: &str) -> usize {
    let segs: Vec<&str> = path.split('.').collect();
    if segs.len() > MAX_REDACTION_DEPTH || segs.iter().any(|s| s.is_empty()) {
        return 0;
    }
    remove_segments(doc, &segs)
}

fn remove_segments(doc: &mut BsonDocument, segs: &[&str]) -> usize {
    match segs {
        [] => 0,
        [last] => usize::from(doc.remove(*last).is_some()),
        [head, rest @ ..] => match doc.get_mut(*head) {
            Some(Bson::Document(inner)) => remove_segments(inner, rest),
            Some(Bson::Array(items)) => items
                .iter_mut()
                .map(|item| match item {
                    Bson::Document(inner) => remove_segments(inner, rest),
                    _ => 0,
                })
                .sum(),
            _ => 0,
        },
    }
}
