//! Post-mutation cache eviction
//!
//! Every resource service calls [`Invalidator::invalidate`] once after a
//! successful store mutation. What gets evicted for which change is decided
//! in [`Invalidator::plan`] and nowhere else.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::store::CacheStore;
use crate::domain::cache::CacheKeyScheme;
use crate::domain::storage::{Resource, ResourceKind};

/// A committed mutation of one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change<'a> {
    Created {
        id: Uuid,
        slug: Option<&'a str>,
    },
    Updated {
        id: Uuid,
        old_slug: Option<&'a str>,
        new_slug: Option<&'a str>,
    },
    Deleted {
        id: Uuid,
        slug: Option<&'a str>,
    },
}

impl<'a> Change<'a> {
    pub fn created<R: Resource>(resource: &'a R) -> Self {
        Self::Created {
            id: resource.id(),
            slug: resource.slug(),
        }
    }

    pub fn updated<R: Resource>(before: &'a R, after: &'a R) -> Self {
        Self::Updated {
            id: before.id(),
            old_slug: before.slug(),
            new_slug: after.slug(),
        }
    }

    pub fn deleted<R: Resource>(resource: &'a R) -> Self {
        Self::Deleted {
            id: resource.id(),
            slug: resource.slug(),
        }
    }
}

/// Keys and glob patterns to evict for one change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evictions {
    pub keys: Vec<String>,
    pub patterns: Vec<String>,
}

/// Applies the eviction policy against the fail-open cache
#[derive(Debug, Clone)]
pub struct Invalidator {
    cache: CacheStore,
    keys: Arc<dyn CacheKeyScheme>,
}

impl Invalidator {
    pub fn new(cache: CacheStore, keys: Arc<dyn CacheKeyScheme>) -> Self {
        Self { cache, keys }
    }

    /// Computes the evictions for a change without touching the cache.
    ///
    /// Only the owning kind's lists are swept; aggregates embedded in other
    /// kinds' lists age out on their own TTL.
    pub fn plan(&self, kind: ResourceKind, change: &Change<'_>) -> Evictions {
        let mut keys = Vec::new();

        match *change {
            // A fresh id cannot be cached yet, but a slug lookup may have
            // been attempted before the row existed.
            Change::Created { slug, .. } => {
                if let Some(slug) = slug {
                    keys.push(self.keys.slug(kind, slug));
                }
            }
            Change::Updated {
                id,
                old_slug,
                new_slug,
            } => {
                keys.push(self.keys.entity(kind, &id.to_string()));

                if let Some(old) = old_slug {
                    keys.push(self.keys.slug(kind, old));
                }
                if let Some(new) = new_slug.filter(|new| Some(*new) != old_slug) {
                    keys.push(self.keys.slug(kind, new));
                }
            }
            Change::Deleted { id, slug } => {
                keys.push(self.keys.entity(kind, &id.to_string()));

                if let Some(slug) = slug {
                    keys.push(self.keys.slug(kind, slug));
                }
            }
        }

        Evictions {
            keys,
            patterns: vec![self.keys.list_pattern(kind)],
        }
    }

    /// Plans a batch of changes to one kind. Direct keys accumulate, list
    /// patterns are swept once for the whole batch.
    pub fn plan_batch(&self, kind: ResourceKind, changes: &[Change<'_>]) -> Evictions {
        let mut merged = Evictions::default();

        for change in changes {
            let plan = self.plan(kind, change);
            merged.keys.extend(plan.keys);

            for pattern in plan.patterns {
                if !merged.patterns.contains(&pattern) {
                    merged.patterns.push(pattern);
                }
            }
        }

        merged
    }

    /// Evicts everything made stale by the change. Cache failures are
    /// swallowed by the underlying [`CacheStore`].
    pub async fn invalidate(&self, kind: ResourceKind, change: Change<'_>) {
        let evictions = self.plan(kind, &change);
        self.apply(kind, &evictions).await;
    }

    /// Evicts a bulk mutation in one pass
    pub async fn invalidate_batch(&self, kind: ResourceKind, changes: &[Change<'_>]) {
        if changes.is_empty() {
            return;
        }

        let evictions = self.plan_batch(kind, changes);
        self.apply(kind, &evictions).await;
    }

    async fn apply(&self, kind: ResourceKind, evictions: &Evictions) {
        for key in &evictions.keys {
            self.cache.delete(key).await;
        }

        let mut swept = 0;
        for pattern in &evictions.patterns {
            swept += self.cache.delete_pattern(pattern).await;
        }

        debug!(
            kind = %kind,
            keys = evictions.keys.len(),
            swept,
            "Invalidated cache entries"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{DefaultKeyScheme, MockCache};
    use std::time::Duration;

    fn invalidator(mock: &Arc<MockCache>) -> Invalidator {
        Invalidator::new(
            CacheStore::new(mock.clone()),
            Arc::new(DefaultKeyScheme::new()),
        )
    }

    fn id() -> Uuid {
        Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap()
    }

    #[test]
    fn test_plan_created() {
        let mock = Arc::new(MockCache::new());
        let plan = invalidator(&mock).plan(
            ResourceKind::Tag,
            &Change::Created {
                id: id(),
                slug: Some("rust"),
            },
        );

        assert_eq!(plan.keys, vec!["tag:slug:rust"]);
        assert_eq!(plan.patterns, vec!["tag:list:*"]);
    }

    #[test]
    fn test_plan_updated_with_new_slug() {
        let mock = Arc::new(MockCache::new());
        let plan = invalidator(&mock).plan(
            ResourceKind::Category,
            &Change::Updated {
                id: id(),
                old_slug: Some("tech"),
                new_slug: Some("technology"),
            },
        );

        assert_eq!(
            plan.keys,
            vec![
                format!("category:{}", id()),
                "category:slug:tech".to_string(),
                "category:slug:technology".to_string(),
            ]
        );
        assert_eq!(plan.patterns, vec!["category:list:*"]);
    }

    #[test]
    fn test_plan_updated_same_slug_is_not_duplicated() {
        let mock = Arc::new(MockCache::new());
        let plan = invalidator(&mock).plan(
            ResourceKind::Post,
            &Change::Updated {
                id: id(),
                old_slug: Some("hello"),
                new_slug: Some("hello"),
            },
        );

        assert_eq!(plan.keys.len(), 2);
    }

    #[test]
    fn test_plan_deleted_without_slug() {
        let mock = Arc::new(MockCache::new());
        let plan = invalidator(&mock).plan(
            ResourceKind::Comment,
            &Change::Deleted { id: id(), slug: None },
        );

        assert_eq!(plan.keys, vec![format!("comment:{}", id())]);
        assert_eq!(plan.patterns, vec!["comment:list:*"]);
    }

    #[tokio::test]
    async fn test_invalidate_evicts_only_owning_kind() {
        let ttl = Duration::from_secs(60);
        let mock = Arc::new(
            MockCache::new()
                .with_entry(&format!("post:{}", id()), &"p", Some(ttl))
                .with_entry("post:slug:hello", &"p", Some(ttl))
                .with_entry("post:list:1:20", &"page", Some(ttl))
                .with_entry("post:list:2:10:tag=x", &"page", Some(ttl))
                .with_entry("tag:list:1:20", &"tags", Some(ttl)),
        );

        invalidator(&mock)
            .invalidate(
                ResourceKind::Post,
                Change::Deleted {
                    id: id(),
                    slug: Some("hello"),
                },
            )
            .await;

        assert_eq!(mock.keys(), vec!["tag:list:1:20"]);
    }

    #[tokio::test]
    async fn test_invalidate_survives_cache_outage() {
        let mock = Arc::new(MockCache::failing());

        invalidator(&mock)
            .invalidate(
                ResourceKind::Product,
                Change::Created {
                    id: id(),
                    slug: Some("artemis"),
                },
            )
            .await;

        assert!(mock.calls() >= 2);
    }

    #[test]
    fn test_plan_batch_sweeps_lists_once() {
        let mock = Arc::new(MockCache::new());
        let other = Uuid::new_v4();
        let changes = [
            Change::Deleted {
                id: id(),
                slug: Some("hello"),
            },
            Change::Deleted {
                id: other,
                slug: Some("world"),
            },
        ];

        let plan = invalidator(&mock).plan_batch(ResourceKind::Post, &changes);

        assert_eq!(plan.keys.len(), 4);
        assert!(plan.keys.contains(&"post:slug:world".to_string()));
        assert_eq!(plan.patterns, vec!["post:list:*"]);
    }

    #[tokio::test]
    async fn test_empty_batch_touches_nothing() {
        let mock = Arc::new(MockCache::new());

        invalidator(&mock)
            .invalidate_batch(ResourceKind::Post, &[])
            .await;

        assert_eq!(mock.calls(), 0);
    }
}
