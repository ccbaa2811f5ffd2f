use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CategoryValidationError {
    #[error("Category name cannot be empty")]
    EmptyName,

    #[error("Category name exceeds maximum length of {0} characters")]
    NameTooLong(usize),
}

const MAX_NAME_LENGTH: usize = 80;

pub fn validate_category_name(name: &str) -> Result<(), CategoryValidationError> {
    if name.trim().is_empty() {
        return Err(CategoryValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CategoryValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    Ok(())
}
