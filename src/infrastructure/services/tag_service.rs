//! Tag service
//!
//! Tag list pages embed a post count per tag. Those counts belong to posts,
//! so post mutations do not sweep tag lists; the pages are cached with the
//! short aggregate TTL instead.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::ListParams;
use crate::domain::post::Post;
use crate::domain::slug::{resolve_slug, validate_slug};
use crate::domain::storage::{Filter, Page, RecordStore, Resource, SortOrder};
use crate::domain::tag::{validate_tag_name, Tag, TagSummary};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;

/// Request for creating a tag
#[derive(Debug, Clone, Default)]
pub struct CreateTagRequest {
    pub name: String,
    pub slug: Option<String>,
}

/// Request for updating a tag
#[derive(Debug, Clone, Default)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TagService {
    ctx: ServiceContext,
}

impl TagService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: CreateTagRequest) -> Result<Tag, DomainError> {
        validate_tag_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;

        let slug = resolve_slug(request.slug.as_deref(), &request.name)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(name = %request.name, slug = %slug, "Creating tag");

        let tag = self.ctx.insert(&Tag::new(request.name, slug)).await?;
        self.ctx.invalidate::<Tag>(Change::created(&tag)).await;

        Ok(tag)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Tag>, DomainError> {
        self.ctx.get_cached(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        self.ctx.get_cached_by_slug(slug).await
    }

    /// Tags by name, each with the number of live posts carrying it
    pub async fn list(&self, params: &ListParams) -> Result<Page<TagSummary>, DomainError> {
        let params = params.unfiltered();
        let mut filter = Filter::new();

        if let Some(term) = params.search() {
            filter = filter.search(["name"], term);
        }

        let key = self.ctx.keys().list(Tag::KIND, &params);
        let ttl = self.ctx.ttls().aggregate;

        self.ctx
            .cache()
            .cached(key, ttl, || self.load_summaries(filter, &params))
            .await
    }

    pub async fn update(&self, id: Uuid, request: UpdateTagRequest) -> Result<Tag, DomainError> {
        info!(id = %id, "Updating tag");

        let before: Tag = self.ctx.load_existing(id).await?;
        let mut tag = before.clone();

        if let Some(name) = request.name {
            validate_tag_name(&name).map_err(|e| DomainError::validation(e.to_string()))?;
            tag.name = name;
        }

        if let Some(slug) = request.slug {
            validate_slug(&slug).map_err(|e| DomainError::validation(e.to_string()))?;
            tag.slug = slug;
        }

        tag.updated_at = Utc::now();

        let tag = self.ctx.replace(&tag).await?;
        self.ctx.invalidate::<Tag>(Change::updated(&before, &tag)).await;

        Ok(tag)
    }

    /// Removes the tag; posts keep the dangling id until they are next edited
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting tag");

        let tag: Tag = self.ctx.load_existing(id).await?;
        self.ctx.remove::<Tag>(id).await?;
        self.ctx.invalidate::<Tag>(Change::deleted(&tag)).await;

        Ok(())
    }

    async fn load_summaries(
        &self,
        filter: Filter,
        params: &ListParams,
    ) -> Result<Page<TagSummary>, DomainError> {
        let tags: Page<Tag> = self
            .ctx
            .load_page(filter, params, ("name", SortOrder::Asc))
            .await?;

        let mut counts = Vec::with_capacity(tags.items.len());
        for tag in &tags.items {
            let posts = Filter::new().contains("tag_ids", tag.id.to_string());
            counts.push(self.ctx.store().count(Post::KIND, &posts).await?);
        }

        let mut counts = counts.into_iter();
        Ok(tags.map(|tag| TagSummary {
            tag,
            post_count: counts.next().unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::services::context::{testing, CacheTtls};
    use crate::infrastructure::services::post_service::{CreatePostRequest, PostService};
    use std::sync::Arc;

    fn services(mock: &Arc<MockCache>) -> (TagService, PostService) {
        let ctx = testing::context(mock);
        (TagService::new(ctx.clone()), PostService::new(ctx))
    }

    fn rust() -> CreateTagRequest {
        CreateTagRequest {
            name: "Rust".to_string(),
            slug: None,
        }
    }

    #[tokio::test]
    async fn test_list_counts_live_posts() {
        let mock = Arc::new(MockCache::new());
        let (tags, posts) = services(&mock);

        let rust = tags.create(rust()).await.unwrap();
        tags.create(CreateTagRequest {
            name: "Go".to_string(),
            slug: None,
        })
        .await
        .unwrap();

        for title in ["One", "Two", "Three"] {
            let mut request = CreatePostRequest::draft(title, "body", Uuid::new_v4());
            request.tag_ids = vec![rust.id];
            posts.create(request).await.unwrap();
        }

        let doomed = posts
            .get_by_slug("three")
            .await
            .unwrap()
            .unwrap();
        posts.delete(doomed.id).await.unwrap();

        let page = tags.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].tag.name, "Go");
        assert_eq!(page.items[0].post_count, 0);
        assert_eq!(page.items[1].tag.name, "Rust");
        assert_eq!(page.items[1].post_count, 2);
    }

    #[tokio::test]
    async fn test_post_mutations_leave_tag_lists_to_expire() {
        let mock = Arc::new(MockCache::new());
        let (tags, posts) = services(&mock);
        let rust = tags.create(rust()).await.unwrap();

        let before = tags.list(&ListParams::default()).await.unwrap();
        assert_eq!(before.items[0].post_count, 0);
        assert_eq!(
            mock.ttl_of("tag:list:1:20"),
            Some(CacheTtls::default().aggregate)
        );

        let mut request = CreatePostRequest::draft("Tagged", "body", Uuid::new_v4());
        request.tag_ids = vec![rust.id];
        posts.create(request).await.unwrap();

        // Only the owning kind's lists are swept
        assert!(mock.contains("tag:list:1:20"));
        let cached = tags.list(&ListParams::default()).await.unwrap();
        assert_eq!(cached.items[0].post_count, 0);

        // A tag mutation refreshes the counts
        tags.update(
            rust.id,
            UpdateTagRequest {
                name: Some("Rust lang".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fresh = tags.list(&ListParams::default()).await.unwrap();
        assert_eq!(fresh.items[0].tag.name, "Rust lang");
        assert_eq!(fresh.items[0].post_count, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let mock = Arc::new(MockCache::new());
        let (tags, _) = services(&mock);
        let tag = tags.create(rust()).await.unwrap();
        assert_eq!(tag.slug, "rust");

        tags.get_by_slug("rust").await.unwrap();
        let renamed = tags
            .update(
                tag.id,
                UpdateTagRequest {
                    slug: Some("rustlang".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.slug, "rustlang");
        assert!(tags.get_by_slug("rust").await.unwrap().is_none());

        tags.delete(tag.id).await.unwrap();
        assert!(tags.get(tag.id).await.unwrap().is_none());
        assert!(tags.create(rust()).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected() {
        let mock = Arc::new(MockCache::new());
        let (tags, _) = services(&mock);

        let result = tags
            .create(CreateTagRequest {
                name: " ".to_string(),
                slug: None,
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }
}
