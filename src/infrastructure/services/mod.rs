//! Resource services
//!
//! Each service composes the soft-delete-aware store, the fail-open cache and
//! the invalidator through a shared [`ServiceContext`].

mod category_service;
mod comment_service;
mod context;
mod password;
mod post_service;
mod product_service;
mod tag_service;
mod user_service;

pub use category_service::{CategoryService, CreateCategoryRequest, UpdateCategoryRequest};
pub use comment_service::{CommentService, CreateCommentRequest};
pub use context::{CacheTtls, ServiceContext, ServiceStore};
pub use password::{Argon2Hasher, PasswordHasher};
pub use post_service::{CreatePostRequest, PostListQuery, PostService, UpdatePostRequest};
pub use product_service::{CreateProductRequest, ProductService, UpdateProductRequest};
pub use tag_service::{CreateTagRequest, TagService, UpdateTagRequest};
pub use user_service::{ChangePasswordRequest, RegisterUserRequest, UserService};

use std::sync::Arc;

/// Every resource service over one shared context
#[derive(Debug, Clone)]
pub struct Services {
    pub posts: PostService,
    pub categories: CategoryService,
    pub tags: TagService,
    pub products: ProductService,
    pub users: UserService,
    pub comments: CommentService,
}

impl Services {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            posts: PostService::new(ctx.clone()),
            categories: CategoryService::new(ctx.clone()),
            tags: TagService::new(ctx.clone()),
            products: ProductService::new(ctx.clone()),
            users: UserService::new(ctx.clone(), Arc::new(Argon2Hasher::new())),
            comments: CommentService::new(ctx),
        }
    }
}
