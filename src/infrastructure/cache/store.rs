//! Fail-open cache facade used by resource services
//!
//! Every backend error or timeout is logged at debug level and treated as a
//! miss (reads) or a no-op (writes). Callers never see a cache failure.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Default budget for a single cache round-trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(250);

/// Default budget for a pattern sweep, which may take many round-trips
pub const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of probing the cache backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheHealth {
    Healthy,
    /// Reachable, but slower than half the operation timeout
    Degraded,
    Unavailable,
}

impl CacheHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Best-effort wrapper around a raw [`Cache`] backend
#[derive(Debug, Clone)]
pub struct CacheStore {
    backend: Arc<dyn Cache>,
    timeout: Duration,
    sweep_timeout: Duration,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn Cache>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_OPERATION_TIMEOUT,
            sweep_timeout: DEFAULT_SWEEP_TIMEOUT,
        }
    }

    /// Sets the per-operation timeout, kept shorter than store timeouts
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the budget for pattern deletes
    pub fn with_sweep_timeout(mut self, timeout: Duration) -> Self {
        self.sweep_timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one backend call under the operation timeout, swallowing any failure
    async fn guarded<T, F>(&self, op: &'static str, key: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.guarded_for(self.timeout, op, key, fut).await
    }

    async fn guarded_for<T, F>(
        &self,
        budget: Duration,
        op: &'static str,
        key: &str,
        fut: F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                debug!(op, key, error = %e, "Cache operation failed, continuing without cache");
                None
            }
            Err(_) => {
                debug!(
                    op,
                    key,
                    timeout_ms = budget.as_millis() as u64,
                    "Cache operation timed out, continuing without cache"
                );
                None
            }
        }
    }

    /// Returns the cached value, or `None` on miss, backend failure or a
    /// payload that no longer deserializes
    pub async fn get<V>(&self, key: &str) -> Option<V>
    where
        V: DeserializeOwned,
    {
        let raw = self
            .guarded("get", key, self.backend.get_raw(key))
            .await
            .flatten()?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set<V>(&self, key: &str, value: &V, ttl: Duration)
    where
        V: Serialize + ?Sized,
    {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(key, error = %e, "Skipping cache write for unserializable value");
                return;
            }
        };

        self.guarded("set", key, self.backend.set_raw(key, &raw, ttl))
            .await;
    }

    /// Returns whether an entry was removed; failures report `false`
    pub async fn delete(&self, key: &str) -> bool {
        self.guarded("delete", key, self.backend.delete(key))
            .await
            .unwrap_or(false)
    }

    /// Deletes every key matching the glob pattern under the sweep budget;
    /// failures report 0
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        self.guarded_for(
            self.sweep_timeout,
            "delete_pattern",
            pattern,
            self.backend.delete_pattern(pattern),
        )
        .await
        .unwrap_or(0)
    }

    pub async fn ping(&self) -> CacheHealth {
        let started = Instant::now();

        match self.guarded("ping", "", self.backend.ping()).await {
            Some(()) if started.elapsed() > self.timeout / 2 => CacheHealth::Degraded,
            Some(()) => CacheHealth::Healthy,
            None => CacheHealth::Unavailable,
        }
    }

    /// Read-through: returns the cached value under `key`, or runs `load`
    /// and caches its result. A `None` key bypasses the cache entirely.
    /// Loader errors propagate and are never cached.
    pub async fn cached<V, F, Fut>(
        &self,
        key: Option<String>,
        ttl: Duration,
        load: F,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>>,
    {
        let Some(key) = key else {
            return load().await;
        };

        if let Some(hit) = self.get::<V>(&key).await {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        debug!(key = %key, "Cache miss");
        let value = load().await?;
        self.set(&key, &value, ttl).await;

        Ok(value)
    }

    /// Read-through for lookups that may find nothing; absent results are
    /// not cached
    pub async fn cached_optional<V, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Option<V>, DomainError>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, DomainError>>,
    {
        if let Some(hit) = self.get::<V>(key).await {
            debug!(key, "Cache hit");
            return Ok(Some(hit));
        }

        debug!(key, "Cache miss");
        let value = load().await?;

        if let Some(found) = &value {
            self.set(key, found, ttl).await;
        }

        Ok(value)
    }
}
