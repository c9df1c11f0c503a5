//! Caller classification.
//!
//! The engine never decides privilege itself; it asks an [`Authorizer`]
//! injected at construction.

use std::collections::HashSet;

/// Decides whether a caller may see restricted fields.
pub trait Authorizer: Send + Sync {
    /// `credential` is the opaque value the caller presented (for example an
    /// `Authorization` header), if any.
    fn is_privileged(&self, credential: Option<&str>) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(Option<&str>) -> bool + Send + Sync,
{
    fn is_privileged(&self, credential: Option<&str>) -> bool {
        self(credential)
    }
}

/// Nobody is privileged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrivilege;

impl Authorizer for NoPrivilege {
    fn is_privileged(&self, _credential: Option<&str>) -> bool {
        false
    }
}

/// Privileged callers are those presenting one of a fixed set of tokens,
/// bare or as `Bearer <token>`.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthorizer {
    tokens: HashSet<String>,
}

impl StaticTokenAuthorizer {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).filter(|t: &String| !t.is_empty()).collect() }
    }
}

impl Authorizer for StaticTokenAuthorizer {
    fn is_privileged(&self, credential: Option<&str>) -> bool {
        let Some(raw) = credential.map(str::trim) else {
            return false;
        };
        let token = raw.strip_prefix("Bearer ").map_or(raw, str::trim);
        !token.is_empty() && self.tokens.contains(token)
    }
}
