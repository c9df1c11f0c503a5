use bson::{Bson, Document as BsonDocument};

/// Returns the first key in `filter` that names a restricted operator.
///
/// Every key is checked regardless of its value's type. Nested documents are
/// walked, and so are the document elements of arrays, which is how `$or`,
/// `$and` and `$nor` carry their clauses.
#[must_use]
pub fn find_restricted_operator<'a>(filter: &'a BsonDocument, operators: &[String]) -> Option<&'a str> {
    for (key, value) in filter {
        if operators.iter().any(|op| op == key) {
            return Some(key.as_str());
        }
        if let Some(found) = scan_value(value, operators) {
            return Some(found);
        }
    }
    None
}

fn scan_value<'a>(value: &'a Bson, operators: &[String]) -> Option<&'a str> {
    match value {
        Bson::Document(d) => find_restricted_operator(d, operators),
        Bson::Array(items) => items.iter().find_map(|v| scan_value(v, operators)),
        _ => None,
    }
}

#[must_use]
pub fn contains_restricted_operator(filter: &BsonDocument, operators: &[String]) -> bool {
    find_restricted_operator(filter, operators).is_some()
}
