//! Product domain

mod entity;

pub use entity::Product;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProductValidationError {
    #[error("Product name cannot be empty")]
    EmptyName,

    #[error("Product price cannot be negative")]
    NegativePrice,

    #[error("Product stock cannot be negative")]
    NegativeStock,
}

pub fn validate_product(name: &str, price_cents: i64, stock: i64) -> Result<(), ProductValidationError> {
    if name.trim().is_empty() {
        return Err(ProductValidationError::EmptyName);
    }

    if price_cents < 0 {
        return Err(ProductValidationError::NegativePrice);
    }

    if stock < 0 {
        return Err(ProductValidationError::NegativeStock);
    }

    Ok(())
}
