//! Product service

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::ListParams;
use crate::domain::product::{validate_product, Product};
use crate::domain::slug::{resolve_slug, validate_slug};
use crate::domain::storage::{Filter, Page, SortOrder};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;

/// Request for creating a product
#[derive(Debug, Clone, Default)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
}

/// Request for updating a product
#[derive(Debug, Clone, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ProductService {
    ctx: ServiceContext,
}

impl ProductService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: CreateProductRequest) -> Result<Product, DomainError> {
        validate_product(&request.name, request.price_cents, request.stock)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let slug = resolve_slug(request.slug.as_deref(), &request.name)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(name = %request.name, slug = %slug, price_cents = request.price_cents, "Creating product");

        let mut product = Product::new(request.name, slug, request.price_cents);
        product.description = request.description;
        product.stock = request.stock;

        let product = self.ctx.insert(&product).await?;
        self.ctx.invalidate::<Product>(Change::created(&product)).await;

        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.ctx.get_cached(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, DomainError> {
        self.ctx.get_cached_by_slug(slug).await
    }

    /// Products by name; `active` narrows to (in)active products
    pub async fn list(
        &self,
        params: &ListParams,
        active: Option<bool>,
    ) -> Result<Page<Product>, DomainError> {
        let params = params.unfiltered().with_optional_filter("active", active);
        let mut filter = Filter::new();

        if let Some(active) = active {
            filter = filter.eq("active", active);
        }
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
        request: UpdateProductRequest,
    ) -> Result<Product, DomainError> {
        info!(id = %id, "Updating product");

        let before: Product = self.ctx.load_existing(id).await?;
        let mut product = before.clone();

        if let Some(name) = request.name {
            product.name = name;
        }
        if let Some(slug) = request.slug {
            validate_slug(&slug).map_err(|e| DomainError::validation(e.to_string()))?;
            product.slug = slug;
        }
        if let Some(description) = request.description {
            product.description = Some(description);
        }
        if let Some(price_cents) = request.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(stock) = request.stock {
            product.stock = stock;
        }
        if let Some(active) = request.active {
            product.active = active;
        }

        validate_product(&product.name, product.price_cents, product.stock)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        product.updated_at = Utc::now();

        let product = self.ctx.replace(&product).await?;
        self.ctx
            .invalidate::<Product>(Change::updated(&before, &product))
            .await;

        Ok(product)
    }

    /// Physically removes the product, releasing its slug
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting product");

        let product: Product = self.ctx.load_existing(id).await?;
        self.ctx.remove::<Product>(id).await?;
        self.ctx
            .invalidate::<Product>(Change::deleted(&product))
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

    fn artemis() -> CreateProductRequest {
        CreateProductRequest {
            name: "Artemis".to_string(),
            slug: Some("artemis".to_string()),
            description: Some("Lunar lander kit".to_string()),
            price_cents: 4999,
            stock: 3,
        }
    }

    #[tokio::test]
    async fn test_hard_delete_releases_slug() {
        let mock = Arc::new(MockCache::new());
        let service = ProductService::new(testing::context(&mock));

        let first = service.create(artemis()).await.unwrap();
        assert!(service.create(artemis()).await.unwrap_err().is_conflict());

        service.delete(first.id).await.unwrap();

        let second = service.create(artemis()).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(
            service.get_by_slug("artemis").await.unwrap().unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_active_filter_is_part_of_the_key() {
        let mock = Arc::new(MockCache::new());
        let service = ProductService::new(testing::context(&mock));

        let product = service.create(artemis()).await.unwrap();
        service
            .create(CreateProductRequest {
                name: "Apollo".to_string(),
                price_cents: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        service
            .update(
                product.id,
                UpdateProductRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let active = service.list(&ListParams::default(), Some(true)).await.unwrap();
        let all = service.list(&ListParams::default(), None).await.unwrap();

        assert_eq!(active.total, 1);
        assert_eq!(active.items[0].name, "Apollo");
        assert_eq!(all.total, 2);
        assert!(mock.contains("product:list:1:20:active=true"));
        assert!(mock.contains("product:list:1:20"));
    }

    #[tokio::test]
    async fn test_caller_filters_cannot_shadow_the_active_list() {
        let mock = Arc::new(MockCache::new());
        let service = ProductService::new(testing::context(&mock));

        let product = service.create(artemis()).await.unwrap();
        service
            .update(
                product.id,
                UpdateProductRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stray = ListParams::new(1, 20).with_filter("active", "true");
        let unfiltered = service.list(&stray, None).await.unwrap();
        assert_eq!(unfiltered.total, 1);
        assert!(!mock.contains("product:list:1:20:active=true"));

        let active = service.list(&ListParams::default(), Some(true)).await.unwrap();
        assert_eq!(active.total, 0);
    }

    #[tokio::test]
    async fn test_update_validates_the_merged_product() {
        let mock = Arc::new(MockCache::new());
        let service = ProductService::new(testing::context(&mock));
        let product = service.create(artemis()).await.unwrap();

        let result = service
            .update(
                product.id,
                UpdateProductRequest {
                    stock: Some(-1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let unchanged = service.get(product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 3);
    }
}
