//! Comment service

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::ListParams;
use crate::domain::comment::{validate_comment, validate_comment_body, Comment};
use crate::domain::post::Post;
use crate::domain::storage::{Filter, Page, SortOrder};
use crate::domain::DomainError;
use crate::infrastructure::cache::Change;

use super::context::ServiceContext;

/// Request for commenting on a post
#[derive(Debug, Clone)]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub author_name: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CommentService {
    ctx: ServiceContext,
}

impl CommentService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Comments can only be added to live posts
    pub async fn create(&self, request: CreateCommentRequest) -> Result<Comment, DomainError> {
        validate_comment(&request.author_name, &request.body)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if self
            .ctx
            .load::<Post>(&Filter::by_id(request.post_id))
            .await?
            .is_none()
        {
            return Err(DomainError::not_found(format!(
                "post '{}' not found",
                request.post_id
            )));
        }

        info!(post_id = %request.post_id, author = %request.author_name, "Creating comment");

        let comment = Comment::new(request.post_id, request.author_name, request.body);
        let comment = self.ctx.insert(&comment).await?;
        self.ctx.invalidate::<Comment>(Change::created(&comment)).await;

        Ok(comment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Comment>, DomainError> {
        self.ctx.get_cached(id).await
    }

    /// Oldest first, cached per post
    pub async fn list_for_post(
        &self,
        post_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<Comment>, DomainError> {
        let params = params.unfiltered().with_filter("post", post_id.to_string());
        let filter = Filter::new().eq("post_id", post_id.to_string());

        self.ctx
            .list_cached(filter, &params, ("created_at", SortOrder::Asc))
            .await
    }

    pub async fn approve(&self, id: Uuid) -> Result<Comment, DomainError> {
        info!(id = %id, "Approving comment");

        let before: Comment = self.ctx.load_existing(id).await?;
        let mut comment = before.clone();
        comment.approved = true;
        comment.updated_at = Utc::now();

        self.commit_update(&before, &comment).await
    }

    /// Replaces the body; an edited comment needs approval again
    pub async fn edit(&self, id: Uuid, body: String) -> Result<Comment, DomainError> {
        validate_comment_body(&body).map_err(|e| DomainError::validation(e.to_string()))?;

        info!(id = %id, "Editing comment");

        let before: Comment = self.ctx.load_existing(id).await?;
        let mut comment = before.clone();
        comment.body = body;
        comment.approved = false;
        comment.updated_at = Utc::now();

        self.commit_update(&before, &comment).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!(id = %id, "Deleting comment");

        let comment: Comment = self.ctx.load_existing(id).await?;
        self.ctx.remove::<Comment>(id).await?;
        self.ctx
            .invalidate::<Comment>(Change::deleted(&comment))
            .await;

        Ok(())
    }

    async fn commit_update(&self, before: &Comment, comment: &Comment) -> Result<Comment, DomainError> {
        let comment = self.ctx.replace(comment).await?;
        self.ctx
            .invalidate::<Comment>(Change::updated(before, &comment))
            .await;

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::services::context::testing;
    use crate::infrastructure::services::post_service::{CreatePostRequest, PostService};
    use std::sync::Arc;

    async fn setup() -> (Arc<MockCache>, CommentService, PostService, Post) {
        let mock = Arc::new(MockCache::new());
        let ctx = testing::context(&mock);
        let posts = PostService::new(ctx.clone());
        let post = posts
            .create(CreatePostRequest::draft("Hello", "body", Uuid::new_v4()))
            .await
            .unwrap();

        (mock, CommentService::new(ctx), posts, post)
    }

    fn comment_on(post: &Post, body: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id: post.id,
            author_name: "ana".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_is_cached_per_post() {
        let (mock, comments, _, post) = setup().await;

        comments.create(comment_on(&post, "First")).await.unwrap();
        comments.create(comment_on(&post, "Second")).await.unwrap();

        let page = comments
            .list_for_post(post.id, &ListParams::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].body, "First");
        assert!(mock.contains(&format!("comment:list:1:20:post={}", post.id)));
    }

    #[tokio::test]
    async fn test_new_comment_sweeps_post_comment_lists() {
        let (mock, comments, _, post) = setup().await;
        comments.create(comment_on(&post, "First")).await.unwrap();
        comments
            .list_for_post(post.id, &ListParams::default())
            .await
            .unwrap();

        comments.create(comment_on(&post, "Second")).await.unwrap();

        assert!(mock.keys().iter().all(|k| !k.starts_with("comment:list:")));
        let page = comments
            .list_for_post(post.id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_comment_on_deleted_post_is_not_found() {
        let (_, comments, posts, post) = setup().await;
        posts.delete(post.id).await.unwrap();

        let result = comments.create(comment_on(&post, "Too late")).await;
        assert!(result.unwrap_err().is_not_found());

        let missing = CreateCommentRequest {
            post_id: Uuid::new_v4(),
            ..comment_on(&post, "Nowhere")
        };
        assert!(comments.create(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_approve_edit_and_delete() {
        let (_, comments, _, post) = setup().await;
        let comment = comments.create(comment_on(&post, "First")).await.unwrap();
        assert!(!comment.approved);

        comments.get(comment.id).await.unwrap();
        let approved = comments.approve(comment.id).await.unwrap();
        assert!(approved.approved);
        assert!(comments.get(comment.id).await.unwrap().unwrap().approved);

        let edited = comments
            .edit(comment.id, "First, revised".to_string())
            .await
            .unwrap();
        assert!(!edited.approved);

        comments.delete(comment.id).await.unwrap();
        assert!(comments.get(comment.id).await.unwrap().is_none());
        assert!(comments.delete(comment.id).await.unwrap_err().is_not_found());
    }
}
