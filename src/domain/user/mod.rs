//! User domain
//!
//! User entities, roles and validation. Token issuance lives outside this crate.

mod entity;
mod validation;

pub use entity::{User, UserProfile, UserRole};
pub use validation::{validate_email, validate_password, validate_username, UserValidationError};
