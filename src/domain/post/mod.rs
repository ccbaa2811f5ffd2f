//! Post domain

mod entity;
mod validation;

pub use entity::{Post, PostStatus};
pub use validation::{
    validate_post_content, validate_post_excerpt, validate_post_title, PostValidationError,
};
