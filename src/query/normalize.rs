use crate::config::EngineConfig;
use crate::errors::QueryError;
use bson::{Bson, Document as BsonDocument};

use super::guard::find_restricted_operator;
use super::parse::{RawRequest, integer_like, non_negative, parse_fields, parse_filter, parse_populate, parse_sort};
use super::telemetry;
use super::types::{DEFAULT_LIMIT, RequestKind, RequestSpec};

/// Turns a raw client request into a [`RequestSpec`] for the given kind of read.
///
/// - `Find`: every sub-field is honoured; `limit` is clamped to
///   `[0, max_limit]` and a usable `page` overrides `skip`.
/// - `FindOne`: filter, shape and relations only; one document, no sort.
/// - `FindById`: shape and relations only; the filter is dropped.
///
/// A missing request is an error for `Find` and yields defaults otherwise.
/// Filters are checked for restricted operators before anything else reads them.
///
/// # Errors
/// [`QueryError::RequestMissing`], [`QueryError::RestrictedOperatorUsed`] or
/// [`QueryError::MalformedRequest`].
pub fn normalize(
    raw: Option<RawRequest>,
    kind: RequestKind,
    config: &EngineConfig,
    collection: &str,
) -> Result<RequestSpec, QueryError> {
    let Some(raw) = raw else {
        return match kind {
            RequestKind::Find => Err(QueryError::RequestMissing),
            RequestKind::FindOne | RequestKind::FindById => Ok(RequestSpec::default()),
        };
    };
    let raw = raw.unwrap_envelope();

    let spec = match kind {
        RequestKind::Find => {
            let filter = parse_filter(raw.filter)?;
            reject_restricted(&filter, config, kind, collection)?;
            let limit = effective_limit(raw.limit.as_ref(), config.max_limit);
            let page = effective_page(raw.page.as_ref());
            let skip = match page {
                Some(p) => (p - 1).saturating_mul(limit),
                None => raw.skip.as_ref().and_then(integer_like).map_or(0, non_negative),
            };
            RequestSpec {
                filter,
                limit,
                skip,
                page,
                sort: parse_sort(raw.sort)?,
                fields: parse_fields(raw.structure)?,
                populate: parse_populate(raw.populate)?,
            }
        }
        RequestKind::FindOne => {
            let filter = parse_filter(raw.filter)?;
            reject_restricted(&filter, config, kind, collection)?;
            RequestSpec {
                filter,
                fields: parse_fields(raw.structure)?,
                populate: parse_populate(raw.populate)?,
                ..RequestSpec::default()
            }
        }
        RequestKind::FindById => RequestSpec {
            fields: parse_fields(raw.structure)?,
            populate: parse_populate(raw.populate)?,
            ..RequestSpec::default()
        },
    };
    log::debug!(
        "{collection}: normalized {} request limit={} skip={} page={:?}",
        kind.as_str(),
        spec.limit,
        spec.skip,
        spec.page
    );
    Ok(spec)
}

fn reject_restricted(
    filter: &BsonDocument,
    config: &EngineConfig,
    kind: RequestKind,
    collection: &str,
) -> Result<(), QueryError> {
    if let Some(op) = find_restricted_operator(filter, &config.restricted_operators) {
        telemetry::log_restricted_filter(collection, kind.as_str(), op, filter);
        return Err(QueryError::RestrictedOperatorUsed(op.to_string()));
    }
    Ok(())
}

/// `limit` clamped to `[0, max_limit]`; absent or unreadable values fall back to the default.
#[must_use]
pub fn effective_limit(raw: Option<&Bson>, max_limit: usize) -> usize {
    match raw {
        None | Some(Bson::Null) => DEFAULT_LIMIT.min(max_limit),
        Some(v) => match integer_like(v) {
            Some(i) => non_negative(i).min(max_limit),
            None => {
                log::debug!("unreadable limit {v}; using default");
                DEFAULT_LIMIT.min(max_limit)
            }
        },
    }
}

/// A page number, if the value is integer-like and non-zero. Negative pages become 1.
#[must_use]
pub fn effective_page(raw: Option<&Bson>) -> Option<usize> {
    let p = raw.and_then(integer_like)?;
    if p == 0 {
        return None;
    }
    Some(non_negative(p.max(1)))
}
