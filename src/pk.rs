// Primary key extraction module
// Resolves the record identifier of a request from its query parameters

use std::fmt;
use std::sync::Arc;

use crate::error::ServiceResult;
use crate::request::Query;

/// Transforms the raw key before it reaches an operation
pub type CastFn = Arc<dyn Fn(String) -> ServiceResult<String> + Send + Sync>;

/// Where to find the primary key and how to cast it
#[derive(Clone, Default)]
pub struct PkConfig {
    name: Option<String>,
    cast: Option<CastFn>,
}

impl PkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the key from `query[name]` instead of `id`/`pk`
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_cast<F>(mut self, cast: F) -> Self
    where
        F: Fn(String) -> ServiceResult<String> + Send + Sync + 'static,
    {
        self.cast = Some(Arc::new(cast));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Query keys that may carry the primary key
    pub fn keys(&self) -> Vec<&str> {
        match &self.name {
            Some(name) => vec![name.as_str()],
            None => vec!["id", "pk"],
        }
    }

    /// Resolve the primary key of a request
    ///
    /// Without a configured name, `id` is tried first and `pk` second. A
    /// repeated parameter yields its first value. Empty strings count as
    /// absent, both before and after the cast.
    pub fn resolve(&self, query: &Query) -> ServiceResult<Option<String>> {
        let raw = match &self.name {
            Some(name) => query.first(name),
            None => non_empty(query.first("id")).or_else(|| query.first("pk")),
        };

        let Some(raw) = non_empty(raw) else {
            return Ok(None);
        };

        let value = match &self.cast {
            Some(cast) => cast(raw.to_string())?,
            None => raw.to_string(),
        };

        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl fmt::Debug for PkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkConfig")
            .field("name", &self.name)
            .field("cast", &self.cast.is_some())
            .finish()
    }
}
