//! Post service
//!
//! Posts are the only soft-deleted resource: `delete` tombstones the row and
//! the tombstoned post keeps its slug.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::cache::{ListParams, DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::domain::category::Category;
use crate::domain::post::{
    validate_post_content, validate_post_excerpt, validate_post_title, Post, PostStatus,
};
use crate::domain::slug::{resolve_slug, validate_slug};
use crate::domain::storage::{Filter, FindQuery, Page, Record, RecordStore, Resource, SortOrder};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;

/// Request for creating a post
#[derive(Debug, Clone)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

impl CreatePostRequest {
    /// Draft with no category or tags
    pub fn draft(title: impl Into<String>, content: impl Into<String>, author_id: Uuid) -> Self {
        Self {
            title: title.into(),
            slug: None,
            content: content.into(),
            excerpt: None,
            status: PostStatus::Draft,
            author_id,
            category_id: None,
            tag_ids: Vec::new(),
        }
    }
}

/// Request for updating a post
#[derive(Debug, Clone, Default)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: Option<PostStatus>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<Vec<Uuid>>,
}

/// Post list query: pagination plus the supported filters
#[derive(Debug, Clone)]
pub struct PostListQuery {
    pub page: u32,
    pub limit: u32,
    pub category_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: Option<PostStatus>,
    pub search: Option<String>,
}

impl Default for PostListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            category_id: None,
            tag_id: None,
            author_id: None,
            status: None,
            search: None,
        }
    }
}

impl PostListQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    /// Cache-facing view of the query
    pub fn params(&self) -> ListParams {
        let params = ListParams::new(self.page, self.limit)
            .with_optional_filter("author", self.author_id)
            .with_optional_filter("category", self.category_id)
            .with_optional_filter("status", self.status)
            .with_optional_filter("tag", self.tag_id);

        match &self.search {
            Some(term) => params.with_search(term.clone()),
            None => params,
        }
    }

    /// Store-facing view of the query
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();

        if let Some(category_id) = self.category_id {
            filter = filter.eq("category_id", category_id.to_string());
        }
        if let Some(tag_id) = self.tag_id {
            filter = filter.contains("tag_ids", tag_id.to_string());
        }
        if let Some(author_id) = self.author_id {
            filter = filter.eq("author_id", author_id.to_string());
        }
        if let Some(status) = self.status {
            filter = filter.eq("status", status.as_str());
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            filter = filter.search(["title", "excerpt", "content"], term);
        }

        filter
    }
}

#[derive(Debug, Clone)]
pub struct PostService {
    ctx: ServiceContext,
}

impl PostService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: CreatePostRequest) -> Result<Post, DomainError> {
        validate_post_title(&request.title).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_post_content(&request.content)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if let Some(excerpt) = &request.excerpt {
            validate_post_excerpt(excerpt).map_err(|e| DomainError::validation(e.to_string()))?;
        }

        if let Some(category_id) = request.category_id {
            self.ensure_category(category_id).await?;
        }

        let slug = resolve_slug(request.slug.as_deref(), &request.title)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(slug = %slug, author_id = %request.author_id, status = %request.status, "Creating post");

        let mut post = Post::new(request.title, slug, request.content, request.author_id);
        post.excerpt = request.excerpt;
        post.category_id = request.category_id;
        post.tag_ids = request.tag_ids;
        post.status = request.status;

        if post.is_published() {
            post.published_at = Some(post.created_at);
        }

        let post = self.ctx.insert(&post).await?;
        self.ctx.invalidate::<Post>(Change::created(&post)).await;

        Ok(post)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        self.ctx.get_cached(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, DomainError> {
        self.ctx.get_cached_by_slug(slug).await
    }

    /// Newest first
    pub async fn list(&self, query: &PostListQuery) -> Result<Page<Post>, DomainError> {
        self.ctx
            .list_cached(query.filter(), &query.params(), ("created_at", SortOrder::Desc))
            .await
    }

    pub async fn update(&self, id: Uuid, request: UpdatePostRequest) -> Result<Post, DomainError> {
        info!(id = %id, "Updating post");

        let before: Post = self.ctx.load_existing(id).await?;
        let mut post = before.clone();

        if let Some(title) = request.title {
            validate_post_title(&title).map_err(|e| DomainError::validation(e.to_string()))?;
            post.title = title;
        }

        if let Some(slug) = request.slug {
            validate_slug(&slug).map_err(|e| DomainError::validation(e.to_string()))?;
            post.slug = slug;
        }

        if let Some(content) = request.content {
            validate_post_content(&content).map_err(|e| DomainError::validation(e.to_string()))?;
            post.content = content;
        }

        if let Some(excerpt) = request.excerpt {
            validate_post_excerpt(&excerpt).map_err(|e| DomainError::validation(e.to_string()))?;
            post.excerpt = Some(excerpt);
        }

        if let Some(category_id) = request.category_id {
            self.ensure_category(category_id).await?;
            post.category_id = Some(category_id);
        }

        if let Some(tag_ids) = request.tag_ids {
            post.tag_ids = tag_ids;
        }

        if let Some(status) = request.status {
            post.status = status;
        }

        post.updated_at = Utc::now();
        if post.is_published() && post.published_at.is_none() {
            post.published_at = Some(post.updated_at);
        }

        self.commit_update(&before, &post).await
    }

    /// Publishes a post; publishing twice keeps the first publication time
    pub async fn publish(&self, id: Uuid) -> Result<Post, DomainError> {
        let before: Post = self.ctx.load_existing(id).await?;

        if before.is_published() {
            debug!(id = %id, "Post already published");
            return Ok(before);
        }

        info!(id = %id, "Publishing post");

        let mut post = before.clone();
        let now = Utc::now();
        post.status = PostStatus::Published;
        post.published_at = Some(post.published_at.unwrap_or(now));
        post.updated_at = now;

        self.commit_update(&before, &post).await
    }

    /// Tombstones a live post; deleting it again is `NotFound`
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting post");

        let post: Post = self.ctx.load_existing(id).await?;
        self.ctx.remove::<Post>(id).await?;
        self.ctx.invalidate::<Post>(Change::deleted(&post)).await;

        Ok(())
    }

    /// Tombstones every live post of an author, marking them archived.
    /// Returns the number of posts affected.
    pub async fn archive_many(&self, author_id: Uuid) -> Result<u64, DomainError> {
        info!(author_id = %author_id, "Archiving posts by author");

        let filter = Filter::new().eq("author_id", author_id.to_string());

        let posts = self
            .ctx
            .store()
            .find_many(Post::KIND, &FindQuery::new(filter.clone()))
            .await?
            .into_iter()
            .map(Post::from_record)
            .collect::<Result<Vec<Post>, DomainError>>()?;

        if posts.is_empty() {
            return Ok(0);
        }

        let mut data = Record::new();
        data.insert(
            "status".to_string(),
            Value::String(PostStatus::Archived.as_str().to_string()),
        );
        data.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        let archived = self
            .ctx
            .store()
            .delete_many_with(Post::KIND, &filter, data)
            .await?;

        let changes: Vec<Change<'_>> = posts.iter().map(Change::deleted).collect();
        self.ctx.invalidate_batch::<Post>(&changes).await;

        Ok(archived)
    }

    /// Tombstoned posts, most recently deleted first. Never cached.
    pub async fn list_deleted(&self, params: &ListParams) -> Result<Page<Post>, DomainError> {
        let field = self.ctx.store().policy().field().to_string();
        let filter = Filter::new().not_null(field.clone());

        self.ctx
            .load_page(filter, params, (field.as_str(), SortOrder::Desc))
            .await
    }

    /// Looks a post up whether or not it is tombstoned. Never cached.
    pub async fn get_including_deleted(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        if let Some(post) = self.ctx.load::<Post>(&Filter::by_id(id)).await? {
            return Ok(Some(post));
        }

        let field = self.ctx.store().policy().field().to_string();
        self.ctx.load(&Filter::by_id(id).not_null(field)).await
    }

    async fn commit_update(&self, before: &Post, post: &Post) -> Result<Post, DomainError> {
        let post = self.ctx.replace(post).await?;
        self.ctx
            .invalidate::<Post>(Change::updated(before, &post))
            .await;

        Ok(post)
    }

    async fn ensure_category(&self, id: Uuid) -> Result<(), DomainError> {
        match self.ctx.load::<Category>(&Filter::by_id(id)).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::validation(format!(
                "Category '{}' does not exist",
                id
            ))),
        }
    }
}
