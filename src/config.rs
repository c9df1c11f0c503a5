//! Per-collection engine configuration.
//!
//! Fixed when a [`crate::engine::QueryEngine`] is built. Loadable from TOML:
//!
//! ```toml
//! restricted_fields = ["secret", "owner.password"]
//! default_fields = ["code", "name", { field = "score", meta = "textScore" }]
//! max_limit = 50
//! wildcard_policy = "redact"
//! ```

use crate::errors::QueryError;
use crate::query::{DEFAULT_MAX_LIMIT, MAX_REDACTION_DEPTH, WILDCARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// An always-projected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultField {
    Wildcard,
    Field(String),
    Relevance { field: String, meta: String },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DefaultFieldSerde {
    Name(String),
    Relevance { field: String, meta: String },
}

impl Serialize for DefaultField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = match self {
            Self::Wildcard => DefaultFieldSerde::Name(WILDCARD.to_string()),
            Self::Field(f) => DefaultFieldSerde::Name(f.clone()),
            Self::Relevance { field, meta } => {
                DefaultFieldSerde::Relevance { field: field.clone(), meta: meta.clone() }
            }
        };
        v.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DefaultField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match DefaultFieldSerde::deserialize(deserializer)? {
            DefaultFieldSerde::Name(n) if n == WILDCARD => Self::Wildcard,
            DefaultFieldSerde::Name(n) => Self::Field(n),
            DefaultFieldSerde::Relevance { field, meta } => Self::Relevance { field, meta },
        })
    }
}

impl From<&str> for DefaultField {
    fn from(s: &str) -> Self {
        if s == WILDCARD { Self::Wildcard } else { Self::Field(s.to_string()) }
    }
}

/// What to do with restricted fields when a caller asks for every field (`"*"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WildcardPolicy {
    /// Restricted fields are still stripped for non-privileged callers.
    #[default]
    Redact,
    /// The wildcard skips redaction entirely, whoever the caller is.
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub restricted_fields: Vec<String>,
    pub default_fields: Vec<DefaultField>,
    pub restricted_operators: Vec<String>,
    pub max_limit: usize,
    pub wildcard_policy: WildcardPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            restricted_fields: Vec::new(),
            default_fields: Vec::new(),
            restricted_operators: vec!["$where".to_string()],
            max_limit: DEFAULT_MAX_LIMIT,
            wildcard_policy: WildcardPolicy::Redact,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_restricted_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_default_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<DefaultField>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_restricted_operators<I, S>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_operators = ops.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    #[must_use]
    pub fn with_wildcard_policy(mut self, policy: WildcardPolicy) -> Self {
        self.wildcard_policy = policy;
        self
    }

    /// # Errors
    /// Returns an error if the TOML is malformed or the resulting config is invalid.
    pub fn from_toml_str(s: &str) -> Result<Self, QueryError> {
        let cfg: Self = toml::from_str(s).map_err(|e| QueryError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or does not hold a valid config.
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Checks the config can be enforced as written.
    ///
    /// Restricted paths deeper than the redaction depth are kept but can only
    /// be stripped through their projection, so they are warned about.
    ///
    /// # Errors
    /// Returns an error for a zero `max_limit` or an empty restricted path/operator.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.max_limit == 0 {
            return Err(QueryError::Config("max_limit must be at least 1".into()));
        }
        if self.restricted_fields.iter().any(|f| f.is_empty()) {
            return Err(QueryError::Config("restricted field paths must not be empty".into()));
        }
        if self.restricted_operators.iter().any(|o| o.is_empty()) {
            return Err(QueryError::Config("restricted operators must not be empty".into()));
        }
        for f in &self.restricted_fields {
            if f.split('.').count() > MAX_REDACTION_DEPTH {
                log::warn!("restricted field {f} is deeper than {MAX_REDACTION_DEPTH} levels and cannot be redacted");
            }
        }
        Ok(())
    }
}
