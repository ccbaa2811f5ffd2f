//! Category domain

mod entity;
mod validation;

pub use entity::Category;
pub use validation::{validate_category_name, CategoryValidationError};
