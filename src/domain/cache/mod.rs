//! Cache domain - Cache backend abstraction and key naming scheme

mod key;
mod repository;

pub use key::{CacheKeyScheme, DefaultKeyScheme, ListParams, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use repository::{glob_to_regex, Cache};

#[cfg(test)]
pub use repository::mock::MockCache;
