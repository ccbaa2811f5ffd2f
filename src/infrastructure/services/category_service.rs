//! Category service

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::ListParams;
use crate::domain::category::{validate_category_name, Category};
use crate::domain::slug::{resolve_slug, validate_slug};
use crate::domain::storage::{Filter, Page, SortOrder};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;

/// Request for creating a category
#[derive(Debug, Clone, Default)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Derived from the name when absent
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Request for updating a category
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Category service; deletes are physical
#[derive(Debug, Clone)]
pub struct CategoryService {
    ctx: ServiceContext,
}

impl CategoryService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<Category, DomainError> {
        validate_category_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;

        let slug = resolve_slug(request.slug.as_deref(), &request.name)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(name = %request.name, slug = %slug, "Creating category");

        let mut category = Category::new(request.name, slug);
        category.description = request.description;

        let category = self.ctx.insert(&category).await?;
        self.ctx.invalidate::<Category>(Change::created(&category)).await;

        Ok(category)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        self.ctx.get_cached(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        self.ctx.get_cached_by_slug(slug).await
    }

    /// Lists categories by name; a search term matches name or description
    pub async fn list(&self, params: &ListParams) -> Result<Page<Category>, DomainError> {
        let params = params.unfiltered();
        let mut filter = Filter::new();

        if let Some(term) = params.search() {
            filter = filter.search(["name", "description"], term);
        }

        self.ctx
            .list_cached(filter, &params, ("name", SortOrder::Asc))
            .await
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<Category, DomainError> {
        info!(id = %id, "Updating category");

        let before: Category = self.ctx.load_existing(id).await?;
        let mut category = before.clone();

        if let Some(name) = request.name {
            validate_category_name(&name).map_err(|e| DomainError::validation(e.to_string()))?;
            category.name = name;
        }

        if let Some(slug) = request.slug {
            validate_slug(&slug).map_err(|e| DomainError::validation(e.to_string()))?;
            category.slug = slug;
        }

        if let Some(description) = request.description {
            category.description = Some(description);
        }

        category.updated_at = Utc::now();

        let category = self.ctx.replace(&category).await?;
        self.ctx
            .invalidate::<Category>(Change::updated(&before, &category))
            .await;

        Ok(category)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting category");

        let category: Category = self.ctx.load_existing(id).await?;
        self.ctx.remove::<Category>(id).await?;
        self.ctx
            .invalidate::<Category>(Change::deleted(&category))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::services::context::testing;
    use std::sync::Arc;

    fn service(mock: &Arc<MockCache>) -> CategoryService {
        CategoryService::new(testing::context(mock))
    }

    fn tech() -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: "Tech".to_string(),
            slug: Some("tech".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_renamed_category_is_not_served_from_stale_list() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        let params = ListParams::new(1, 20);

        let category = service.create(tech()).await.unwrap();

        let first = service.list(&params).await.unwrap();
        assert_eq!(first.items[0].name, "Tech");
        assert!(mock.contains("category:list:1:20"));

        service
            .update(
                category.id,
                UpdateCategoryRequest {
                    name: Some("Technology".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!mock.contains("category:list:1:20"));

        let second = service.list(&params).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "Technology");
        assert!(second.items.iter().all(|c| c.name != "Tech"));
    }

    #[tokio::test]
    async fn test_slug_derived_from_name() {
        let mock = Arc::new(MockCache::new());
        let category = service(&mock)
            .create(CreateCategoryRequest {
                name: "Rust & Systems".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(category.slug, "rust-systems");
    }

    #[tokio::test]
    async fn test_duplicate_name_or_slug_conflicts() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        service.create(tech()).await.unwrap();
        let keys_before = mock.keys();

        let same_slug = service
            .create(CreateCategoryRequest {
                name: "Technik".to_string(),
                slug: Some("tech".to_string()),
                description: None,
            })
            .await;
        assert!(same_slug.unwrap_err().is_conflict());

        let same_name = service
            .create(CreateCategoryRequest {
                name: "Tech".to_string(),
                slug: Some("tech-2".to_string()),
                description: None,
            })
            .await;
        assert!(same_name.unwrap_err().is_conflict());

        // Nothing committed, so nothing was invalidated
        assert_eq!(mock.keys(), keys_before);
    }

    #[tokio::test]
    async fn test_slug_change_evicts_old_and_new_slug_keys() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        let category = service.create(tech()).await.unwrap();

        assert!(service.get_by_slug("tech").await.unwrap().is_some());
        assert!(service.get(category.id).await.unwrap().is_some());
        assert!(mock.contains("category:slug:tech"));

        service
            .update(
                category.id,
                UpdateCategoryRequest {
                    slug: Some("technology".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!mock.contains("category:slug:tech"));
        assert!(!mock.contains(&format!("category:{}", category.id)));
        assert!(service.get_by_slug("tech").await.unwrap().is_none());
        assert_eq!(
            service.get_by_slug("technology").await.unwrap().unwrap().id,
            category.id
        );
    }

    #[tokio::test]
    async fn test_delete_releases_slug() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        let category = service.create(tech()).await.unwrap();

        service.delete(category.id).await.unwrap();

        assert!(service.get(category.id).await.unwrap().is_none());
        assert!(service.create(tech()).await.is_ok());
        assert!(service.delete(category.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_search_lists_bypass_cache() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        service.create(tech()).await.unwrap();

        let page = service
            .list(&ListParams::new(1, 20).with_search("tec"))
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert!(mock.keys().iter().all(|k| !k.starts_with("category:list:")));
    }

    #[tokio::test]
    async fn test_unknown_filters_share_the_plain_list_key() {
        let mock = Arc::new(MockCache::new());
        let service = service(&mock);
        service.create(tech()).await.unwrap();

        service
            .list(&ListParams::new(1, 20).with_filter("colour", "blue"))
            .await
            .unwrap();

        assert_eq!(mock.keys(), vec!["category:list:1:20".to_string()]);
    }
}
