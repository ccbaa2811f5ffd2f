//! Post validation utilities

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PostValidationError {
    #[error("Post title cannot be empty")]
    EmptyTitle,

    #[error("Post title exceeds maximum length of {0} characters")]
    TitleTooLong(usize),

    #[error("Post content cannot be empty")]
    EmptyContent,

    #[error("Post excerpt exceeds maximum length of {0} characters")]
    ExcerptTooLong(usize),
}

const MAX_TITLE_LENGTH: usize = 200;
const MAX_EXCERPT_LENGTH: usize = 500;

pub fn validate_post_title(title: &str) -> Result<(), PostValidationError> {
    if title.trim().is_empty() {
        return Err(PostValidationError::EmptyTitle);
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(PostValidationError::TitleTooLong(MAX_TITLE_LENGTH));
    }

    Ok(())
}

pub fn validate_post_content(content: &str) -> Result<(), PostValidationError> {
    if content.trim().is_empty() {
        return Err(PostValidationError::EmptyContent);
    }

    Ok(())
}

pub fn validate_post_excerpt(excerpt: &str) -> Result<(), PostValidationError> {
    if excerpt.chars().count() > MAX_EXCERPT_LENGTH {
        return Err(PostValidationError::ExcerptTooLong(MAX_EXCERPT_LENGTH));
    }

    Ok(())
}
