//! Cache key naming scheme
//!
//! Keys are namespaced per resource kind:
//! - `{kind}:{id}` for entity lookups
//! - `{kind}:slug:{slug}` for slug lookups
//! - `{kind}:list:{page}:{limit}[:{filter_digest}]` for list pages
//!
//! All list variants of a kind share the `{kind}:list:` prefix so a single
//! pattern delete evicts every cached page.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::domain::storage::ResourceKind;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Pagination, filters and search for a list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    page: u32,
    limit: u32,
    /// Non-pagination filters (sorted for consistency)
    filters: BTreeMap<String, String>,
    search: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl ListParams {
    /// Page is clamped to >= 1 and limit to 1..=100
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
            filters: BTreeMap::new(),
            search: None,
        }
    }

    /// Adds a filter; empty values are ignored
    pub(crate) fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();

        if !value.trim().is_empty() {
            self.filters.insert(key.into(), value);
        }
        self
    }

    /// Adds an optional filter
    pub(crate) fn with_optional_filter<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_filter(key, v.to_string()),
            None => self,
        }
    }

    /// Same page, limit and search with every filter dropped
    ///
    /// Services rebuild filters from their typed arguments so the key digest
    /// always describes the query the store runs.
    pub fn unfiltered(&self) -> Self {
        Self {
            filters: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Sets a search term; blank terms are ignored
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let trimmed = term.trim();

        self.search = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * self.limit as usize
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Stable encoding of the non-pagination filters, if any apply
    pub fn filter_digest(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }

        let parts: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        Some(parts.join(":"))
    }

    /// Search queries are never cached
    pub fn is_cacheable(&self) -> bool {
        self.search.is_none()
    }
}

/// Pure key-builder functions, injectable so tests can swap the scheme
pub trait CacheKeyScheme: Send + Sync + Debug {
    /// Optional global namespace prepended to every key
    fn namespace(&self) -> Option<&str> {
        None
    }

    fn scoped(&self, key: String) -> String {
        match self.namespace() {
            Some(ns) => format!("{}:{}", ns, key),
            None => key,
        }
    }

    /// `{kind}:{id}`
    fn entity(&self, kind: ResourceKind, id: &str) -> String {
        self.scoped(format!("{}:{}", kind.as_str(), id))
    }

    /// `{kind}:slug:{slug}`
    fn slug(&self, kind: ResourceKind, slug: &str) -> String {
        self.scoped(format!("{}:slug:{}", kind.as_str(), slug))
    }

    /// `{kind}:list:{page}:{limit}[:{digest}]`, or `None` for search queries
    fn list(&self, kind: ResourceKind, params: &ListParams) -> Option<String> {
        if !params.is_cacheable() {
            return None;
        }

        let base = format!("{}:list:{}:{}", kind.as_str(), params.page(), params.limit());

        let key = match params.filter_digest() {
            Some(digest) => format!("{}:{}", base, digest),
            None => base,
        };

        Some(self.scoped(key))
    }

    /// Pattern matching every list variant of a kind
    fn list_pattern(&self, kind: ResourceKind) -> String {
        self.scoped(format!("{}:list:*", kind.as_str()))
    }
}

/// Default key scheme
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyScheme {
    namespace: Option<String>,
}

impl DefaultKeyScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every key, e.g. with a schema version
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl CacheKeyScheme for DefaultKeyScheme {
    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}
