use crate::errors::StoreError;
use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

const MAX_PATH_DEPTH: usize = 32;
const MAX_IN_SET: usize = 1024;
const MAX_SORT_FIELDS: usize = 16;

/// Evaluates a filter document against `doc`.
///
/// Supports implicit equality on dot paths (with array membership),
/// `$eq $ne $gt $gte $lt $lte $in $nin $exists $not`, the logical
/// `$and $or $nor`, `$text: {$search}` and, with the `regex` feature,
/// `$regex`/`$options`.
///
/// # Errors
/// [`StoreError::UnsupportedOperator`] for any other operator or a
/// malformed operand.
pub fn matches(doc: &BsonDocument, filter: &BsonDocument) -> Result<bool, StoreError> {
    for (key, cond) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for f in sub_filters(key, cond)? {
                    if !matches(doc, f)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_match(doc, key, cond)?,
            "$nor" => !any_match(doc, key, cond)?,
            "$text" => {
                let search = match cond {
                    Bson::Document(d) => d.get_str("$search").ok(),
                    _ => None,
                };
                let Some(search) = search else {
                    return Err(StoreError::UnsupportedOperator("$text without $search".into()));
                };
                text_score(doc, search) > 0.0
            }
            op if op.starts_with('$') => return Err(StoreError::UnsupportedOperator(op.to_string())),
            path => field_matches(&resolve(doc, path), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'a>(op: &str, cond: &'a Bson) -> Result<Vec<&'a BsonDocument>, StoreError> {
    let Bson::Array(items) = cond else {
        return Err(StoreError::UnsupportedOperator(format!("{op} expects an array")));
    };
    items
        .iter()
        .map(|b| match b {
            Bson::Document(d) => Ok(d),
            _ => Err(StoreError::UnsupportedOperator(format!("{op} expects documents"))),
        })
        .collect()
}

fn any_match(doc: &BsonDocument, op: &str, cond: &Bson) -> Result<bool, StoreError> {
    for f in sub_filters(op, cond)? {
        if matches(doc, f)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_operator_doc(d: &BsonDocument) -> bool {
    d.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn field_matches(values: &[&Bson], cond: &Bson) -> Result<bool, StoreError> {
    match cond {
        Bson::Document(ops) if is_operator_doc(ops) => operators_match(values, ops),
        Bson::RegularExpression(_) => {
            let (pattern, options) = regex_source(cond, "")?;
            regex_match(values, &pattern, &options)
        }
        _ => Ok(equals_any(values, cond)),
    }
}

fn operators_match(values: &[&Bson], ops: &BsonDocument) -> Result<bool, StoreError> {
    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => equals_any(values, arg),
            "$ne" => !equals_any(values, arg),
            "$gt" => compares(values, arg, |o| o == Ordering::Greater),
            "$gte" => compares(values, arg, |o| o != Ordering::Less),
            "$lt" => compares(values, arg, |o| o == Ordering::Less),
            "$lte" => compares(values, arg, |o| o != Ordering::Greater),
            "$in" => in_set(values, op, arg)?,
            "$nin" => !in_set(values, op, arg)?,
            "$exists" => !values.is_empty() == truthy(arg),
            "$not" => match arg {
                Bson::Document(inner) => !operators_match(values, inner)?,
                _ => return Err(StoreError::UnsupportedOperator("$not expects a document".into())),
            },
            "$regex" => {
                let (pattern, options) = regex_source(arg, ops.get_str("$options").unwrap_or(""))?;
                regex_match(values, &pattern, &options)?
            }
            "$options" if ops.contains_key("$regex") => true,
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Pattern and flags from either `{$regex: "..", $options: ".."}` or a BSON regex literal.
/// JSON filters may arrive in either shape depending on how extended JSON was read.
fn regex_source(arg: &Bson, options: &str) -> Result<(String, String), StoreError> {
    match arg {
        Bson::String(pattern) => Ok((pattern.clone(), options.to_string())),
        Bson::RegularExpression(_) => {
            let ext = arg.clone().into_relaxed_extjson();
            let parts = ext.get("$regularExpression");
            let field = |k: &str| parts.and_then(|p| p.get(k)).and_then(|v| v.as_str()).map(str::to_string);
            match (field("pattern"), field("options")) {
                (Some(p), Some(o)) => Ok((p, o)),
                _ => Err(StoreError::UnsupportedOperator("$regex".into())),
            }
        }
        _ => Err(StoreError::UnsupportedOperator("$regex expects a string".into())),
    }
}

#[cfg(feature = "regex")]
fn regex_match(values: &[&Bson], pattern: &str, options: &str) -> Result<bool, StoreError> {
    let re = regex::RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .build()
        .map_err(|e| StoreError::UnsupportedOperator(format!("$regex: {e}")))?;
    Ok(candidates(values).any(|v| matches!(v, Bson::String(s) if re.is_match(s))))
}

#[cfg(not(feature = "regex"))]
fn regex_match(_values: &[&Bson], _pattern: &str, _options: &str) -> Result<bool, StoreError> {
    Err(StoreError::UnsupportedOperator("$regex".into()))
}

fn in_set(values: &[&Bson], op: &str, arg: &Bson) -> Result<bool, StoreError> {
    let Bson::Array(set) = arg else {
        return Err(StoreError::UnsupportedOperator(format!("{op} expects an array")));
    };
    Ok(set.iter().take(MAX_IN_SET).any(|x| equals_any(values, x)))
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

/// Values at `path` plus, for arrays, their elements.
fn candidates<'a>(values: &'a [&'a Bson]) -> impl Iterator<Item = &'a Bson> {
    values.iter().flat_map(|v| {
        let elems = match v {
            Bson::Array(items) => items.iter(),
            _ => [].iter(),
        };
        std::iter::once(*v).chain(elems)
    })
}

fn equals_any(values: &[&Bson], target: &Bson) -> bool {
    if values.is_empty() {
        return matches!(target, Bson::Null);
    }
    candidates(values).any(|v| bson_eq(v, target))
}

fn compares(values: &[&Bson], target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates(values)
        .filter(|v| !matches!(v, Bson::Array(_)) && comparable(v, target))
        .any(|v| accept(compare_bson(v, target)))
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b)) || type_rank(a) == type_rank(b)
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return compare_bson(a, b) == Ordering::Equal;
    }
    a == b
}

/// Every value reachable at a dot path, descending into arrays of documents.
fn resolve<'a>(doc: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let segs: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segs.len() > MAX_PATH_DEPTH {
        return Vec::new();
    }
    let mut out = Vec::new();
    collect(doc, &segs, &mut out);
    out
}

fn collect<'a>(doc: &'a BsonDocument, segs: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segs.split_first() else {
        return;
    };
    let Some(v) = doc.get(*head) else {
        return;
    };
    if rest.is_empty() {
        out.push(v);
        return;
    }
    match v {
        Bson::Document(d) => collect(d, rest, out),
        Bson::Array(items) => {
            for item in items {
                if let Bson::Document(d) = item {
                    collect(d, rest, out);
                }
            }
        }
        _ => {}
    }
}

/// Path lookup through embedded documents only, used for sorting.
fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut cur = doc;
    let mut parts = path.split('.').take(MAX_PATH_DEPTH).peekable();
    while let Some(part) = parts.next() {
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

/// Relevance of `doc` for a free-text search: how many times the search
/// terms occur as words in its string values, case-insensitively.
#[must_use]
pub fn text_score(doc: &BsonDocument, search: &str) -> f64 {
    let terms: Vec<String> = search.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return 0.0;
    }
    let mut hits = 0u32;
    doc.values().for_each(|v| count_terms(v, &terms, &mut hits));
    f64::from(hits)
}

fn count_terms(v: &Bson, terms: &[String], hits: &mut u32) {
    match v {
        Bson::String(s) => {
            for word in s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                let word = word.to_lowercase();
                *hits += u32::try_from(terms.iter().filter(|t| **t == word).count()).unwrap_or(0);
            }
        }
        Bson::Array(items) => items.iter().for_each(|i| count_terms(i, terms, hits)),
        Bson::Document(d) => d.values().for_each(|i| count_terms(i, terms, hits)),
        _ => {}
    }
}

/// The `$search` string of a `$text` clause, if the filter has one.
pub(crate) fn text_search(filter: &BsonDocument) -> Option<&str> {
    filter.get_document("$text").ok()?.get_str("$search").ok()
}

fn is_meta(v: &Bson) -> bool {
    matches!(v, Bson::Document(d) if d.contains_key("$meta"))
}

/// Orders two documents by a storage sort document. `$meta` keys sort by
/// relevance score, highest first.
pub(crate) fn compare_docs(
    a: (&BsonDocument, f64),
    b: (&BsonDocument, f64),
    sort: &BsonDocument,
) -> Ordering {
    for (field, dir) in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = if is_meta(dir) {
            b.1.total_cmp(&a.1)
        } else {
            let ord = match (get_path(a.0, field), get_path(b.0, field)) {
                (Some(x), Some(y)) => compare_bson(x, y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let desc = matches!(dir, Bson::Int32(i) if *i < 0)
                || matches!(dir, Bson::Int64(i) if *i < 0)
                || matches!(dir, Bson::Double(f) if *f < 0.0);
            if desc { ord.reverse() } else { ord }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Applies a storage projection.
///
/// Plain entries select fields (dot paths allowed; `_id` is always kept);
/// `$meta` entries receive the relevance score. A projection made only of
/// `$meta` entries keeps every field.
pub(crate) fn project(doc: &BsonDocument, projection: &BsonDocument, score: f64) -> BsonDocument {
    let includes: Vec<&str> = projection
        .iter()
        .filter(|(k, v)| k.as_str() != "_id" && !is_meta(v) && truthy(v))
        .map(|(k, _)| k.as_str())
        .collect();
    let mut out = if includes.is_empty() {
        doc.clone()
    } else {
        let mut paths = includes;
        paths.push("_id");
        include_paths(doc, &paths)
    };
    for (field, v) in projection {
        if is_meta(v) {
            out.insert(field.clone(), Bson::Double(score));
        }
    }
    out
}

fn include_paths(doc: &BsonDocument, paths: &[&str]) -> BsonDocument {
    let mut out = BsonDocument::new();
    for (k, v) in doc {
        if paths.contains(&k.as_str()) {
            out.insert(k.clone(), v.clone());
            continue;
        }
        let prefix = format!("{k}.");
        let nested: Vec<&str> = paths.iter().filter_map(|p| p.strip_prefix(prefix.as_str())).collect();
        if nested.is_empty() {
            continue;
        }
        match v {
            Bson::Document(d) => {
                out.insert(k.clone(), include_paths(d, &nested));
            }
            Bson::Array(items) => {
                let projected = items
                    .iter()
                    .filter_map(|i| match i {
                        Bson::Document(d) => Some(Bson::Document(include_paths(d, &nested))),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                out.insert(k.clone(), projected);
            }
            _ => {}
        }
    }
    out
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    fn as_f64_num(x: &Bson) -> f64 {
        match x {
            Bson::Int32(i) => f64::from(*i),
            Bson::Int64(i) => *i as f64,
            Bson::Double(f) => *f,
            Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 255,
    }
}
