//! Slug derivation and validation

use slug::slugify;
use thiserror::Error;

const MAX_SLUG_LENGTH: usize = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,

    #[error("failed to derive slug from `{0}`")]
    Unrepresentable(String),

    #[error("slug exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("slug may only contain lowercase letters, digits and single hyphens: `{0}`")]
    InvalidFormat(String),
}

/// Derives a URL slug from human-readable text
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable(input.to_string()));
    }

    if candidate.len() > MAX_SLUG_LENGTH {
        return Ok(candidate[..MAX_SLUG_LENGTH].trim_end_matches('-').to_string());
    }

    Ok(candidate)
}

/// Validates a caller-supplied slug
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }

    if slug.len() > MAX_SLUG_LENGTH {
        return Err(SlugError::TooLong(MAX_SLUG_LENGTH));
    }

    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if !well_formed {
        return Err(SlugError::InvalidFormat(slug.to_string()));
    }

    Ok(())
}

/// Uses the explicit slug when given, otherwise derives one from `source`
pub fn resolve_slug(explicit: Option<&str>, source: &str) -> Result<String, SlugError> {
    match explicit {
        Some(slug) => {
            validate_slug(slug)?;
            Ok(slug.to_string())
        }
        None => derive_slug(source),
    }
}
