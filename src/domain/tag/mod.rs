//! Tag domain

mod entity;

pub use entity::{Tag, TagSummary};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TagValidationError {
    #[error("Tag name cannot be empty")]
    EmptyName,

    #[error("Tag name exceeds maximum length of {0} characters")]
    NameTooLong(usize),
}

const MAX_TAG_NAME_LENGTH: usize = 50;

pub fn validate_tag_name(name: &str) -> Result<(), TagValidationError> {
    if name.trim().is_empty() {
        return Err(TagValidationError::EmptyName);
    }

    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(TagValidationError::NameTooLong(MAX_TAG_NAME_LENGTH));
    }

    Ok(())
}
