//! Domain layer - Core entities, query model and caching policies

pub mod cache;
pub mod category;
pub mod comment;
pub mod error;
pub mod post;
pub mod product;
pub mod slug;
pub mod storage;
pub mod tag;
pub mod user;

pub use cache::{Cache, CacheKeyScheme, DefaultKeyScheme, ListParams};
pub use category::Category;
pub use comment::Comment;
pub use error::DomainError;
pub use post::{Post, PostStatus};
pub use product::Product;
pub use storage::{
    DeleteAction, DeleteRequest, Filter, FindQuery, Page, Record, RecordStore, Resource,
    ResourceKind, SoftDeleteFilter,
};
pub use tag::{Tag, TagSummary};
pub use user::{User, UserProfile, UserRole};
