//! Shared plumbing for resource services
//!
//! A [`ServiceContext`] bundles the soft-delete-wrapped store, the fail-open
//! cache, the key scheme and the invalidator. Services never see the raw
//! store.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{CacheKeyScheme, DefaultKeyScheme, ListParams};
use crate::domain::storage::{
    Filter, FindQuery, Page, RecordStore, Resource, SortOrder, SoftDeleteFilter,
};
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheStore, Change, Invalidator};
use crate::infrastructure::storage::SoftDeleteStore;
use uuid::Uuid;

/// The store type every service talks to
pub type ServiceStore = SoftDeleteStore<Arc<dyn RecordStore>>;

/// Cache lifetimes per entry class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Single-entity lookups by id or slug
    pub entity: Duration,
    /// List pages
    pub list: Duration,
    /// Lists embedding counts from other kinds
    pub aggregate: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            entity: Duration::from_secs(3600),
            list: Duration::from_secs(300),
            aggregate: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceContext {
    store: Arc<ServiceStore>,
    cache: CacheStore,
    keys: Arc<dyn CacheKeyScheme>,
    invalidator: Invalidator,
    ttls: CacheTtls,
}

impl ServiceContext {
    /// Wraps `store` with the default soft-delete policy
    pub fn new(store: Arc<dyn RecordStore>, cache: CacheStore) -> Self {
        Self::with_policy(store, cache, SoftDeleteFilter::default())
    }

    pub fn with_policy(
        store: Arc<dyn RecordStore>,
        cache: CacheStore,
        policy: SoftDeleteFilter,
    ) -> Self {
        let keys: Arc<dyn CacheKeyScheme> = Arc::new(DefaultKeyScheme::new());

        Self {
            store: Arc::new(SoftDeleteStore::with_policy(store, policy)),
            invalidator: Invalidator::new(cache.clone(), keys.clone()),
            cache,
            keys,
            ttls: CacheTtls::default(),
        }
    }

    /// Swaps the key scheme used for both reads and invalidation
    pub fn with_key_scheme(mut self, keys: Arc<dyn CacheKeyScheme>) -> Self {
        self.invalidator = Invalidator::new(self.cache.clone(), keys.clone());
        self.keys = keys;
        self
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn store(&self) -> &ServiceStore {
        &self.store
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn keys(&self) -> &dyn CacheKeyScheme {
        self.keys.as_ref()
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Evicts whatever `change` made stale
    pub async fn invalidate<R: Resource>(&self, change: Change<'_>) {
        self.invalidator.invalidate(R::KIND, change).await;
    }

    pub async fn invalidate_batch<R: Resource>(&self, changes: &[Change<'_>]) {
        self.invalidator.invalidate_batch(R::KIND, changes).await;
    }

    /// Loads the first visible resource matching `filter`, bypassing the cache
    pub async fn load<R: Resource>(&self, filter: &Filter) -> Result<Option<R>, DomainError> {
        self.store
            .find(R::KIND, filter)
            .await?
            .map(R::from_record)
            .transpose()
    }

    /// Loads a resource by id or fails with `NotFound`
    pub async fn load_existing<R: Resource>(&self, id: Uuid) -> Result<R, DomainError> {
        self.load(&Filter::by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("{} '{}' not found", R::KIND, id)))
    }

    /// Loads one page of visible resources plus the total count
    pub async fn load_page<R: Resource>(
        &self,
        filter: Filter,
        params: &ListParams,
        sort: (&str, SortOrder),
    ) -> Result<Page<R>, DomainError> {
        let total = self.store.count(R::KIND, &filter).await?;

        let query = FindQuery::new(filter)
            .order_by(sort.0, sort.1)
            .paginate(params.offset(), params.limit() as usize);

        let items = self
            .store
            .find_many(R::KIND, &query)
            .await?
            .into_iter()
            .map(R::from_record)
            .collect::<Result<Vec<R>, DomainError>>()?;

        Ok(Page::new(items, total, params.page(), params.limit()))
    }

    /// Read-through lookup by id under `{kind}:{id}`
    pub async fn get_cached<R: Resource>(&self, id: Uuid) -> Result<Option<R>, DomainError> {
        let key = self.keys.entity(R::KIND, &id.to_string());
        let filter = Filter::by_id(id);

        self.cache
            .cached_optional(&key, self.ttls.entity, || self.load(&filter))
            .await
    }

    /// Read-through lookup by slug under `{kind}:slug:{slug}`
    pub async fn get_cached_by_slug<R: Resource>(
        &self,
        slug: &str,
    ) -> Result<Option<R>, DomainError> {
        let key = self.keys.slug(R::KIND, slug);
        let filter = Filter::new().eq("slug", slug);

        self.cache
            .cached_optional(&key, self.ttls.entity, || self.load(&filter))
            .await
    }

    /// Read-through list page; search queries skip the cache
    pub async fn list_cached<R: Resource>(
        &self,
        filter: Filter,
        params: &ListParams,
        sort: (&str, SortOrder),
    ) -> Result<Page<R>, DomainError> {
        let key = self.keys.list(R::KIND, params);

        self.cache
            .cached(key, self.ttls.list, || self.load_page(filter, params, sort))
            .await
    }

    /// Inserts a new resource
    pub async fn insert<R: Resource>(&self, resource: &R) -> Result<R, DomainError> {
        let record = self.store.insert(R::KIND, resource.to_record()?).await?;
        R::from_record(record)
    }

    /// Replaces the visible resource with the same id
    pub async fn replace<R: Resource>(&self, resource: &R) -> Result<R, DomainError> {
        let record = self
            .store
            .update(R::KIND, &Filter::by_id(resource.id()), resource.to_record()?)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("{} '{}' not found", R::KIND, resource.id()))
            })?;

        R::from_record(record)
    }

    /// Deletes by id through the soft-delete policy; `NotFound` when nothing
    /// visible matched
    pub async fn remove<R: Resource>(&self, id: Uuid) -> Result<(), DomainError> {
        if self.store.delete(R::KIND, &Filter::by_id(id)).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("{} '{}' not found", R::KIND, id)))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::storage::InMemoryRecordStore;

    /// Context over a fresh in-memory store and the given mock cache
    pub fn context(cache: &Arc<MockCache>) -> ServiceContext {
        ServiceContext::new(
            Arc::new(InMemoryRecordStore::new()),
            CacheStore::new(cache.clone()).with_timeout(Duration::from_millis(100)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::Category;

    #[tokio::test]
    async fn test_get_cached_populates_entity_key() {
        let mock = Arc::new(MockCache::new());
        let ctx = testing::context(&mock);

        let category = ctx.insert(&Category::new("Tech", "tech")).await.unwrap();
        let loaded: Option<Category> = ctx.get_cached(category.id).await.unwrap();

        assert_eq!(loaded.unwrap().name, "Tech");
        assert!(mock.contains(&format!("category:{}", category.id)));
    }

    #[tokio::test]
    async fn test_missing_entities_are_not_cached() {
        let mock = Arc::new(MockCache::new());
        let ctx = testing::context(&mock);

        let missing: Option<Category> = ctx.get_cached_by_slug("nope").await.unwrap();

        assert!(missing.is_none());
        assert!(mock.keys().is_empty());
    }

    #[tokio::test]
    async fn test_custom_key_scheme_is_used_for_reads_and_invalidation() {
        let mock = Arc::new(MockCache::new());
        let ctx = testing::context(&mock)
            .with_key_scheme(Arc::new(DefaultKeyScheme::new().with_namespace("v2")));

        let category = ctx.insert(&Category::new("Tech", "tech")).await.unwrap();
        let _: Option<Category> = ctx.get_cached_by_slug("tech").await.unwrap();
        assert!(mock.contains("v2:category:slug:tech"));

        ctx.invalidate::<Category>(Change::deleted(&category)).await;
        assert!(!mock.contains("v2:category:slug:tech"));
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let mock = Arc::new(MockCache::new());
        let ctx = testing::context(&mock);

        let result = ctx.remove::<Category>(Uuid::new_v4()).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
