//! Cache trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Raw cache backend with per-key TTL and glob pattern deletion.
///
/// Backends report every failure; fail-open handling lives one layer up.
/// Values are JSON strings so the trait stays dyn-compatible.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value from the cache
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value in the cache with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a value from the cache
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes all keys matching a glob pattern (`*` wildcard)
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Round-trips to the backend
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Converts a glob pattern (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    regex::Regex::new(&expr).map_err(|e| DomainError::cache(format!("Invalid pattern: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex_escapes_literals() {
        let regex = glob_to_regex("post:list:*").unwrap();

        assert!(regex.is_match("post:list:1:20"));
        assert!(!regex.is_match("xpost:list:1"));

        let dotted = glob_to_regex("a.b:*").unwrap();
        assert!(dotted.is_match("a.b:1"));
        assert!(!dotted.is_match("axb:1"));
    }
}
