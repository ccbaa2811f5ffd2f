//! Cache infrastructure - backends, fail-open facade and invalidation

mod factory;
mod in_memory;
mod invalidation;
mod redis;
mod store;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use invalidation::{Change, Evictions, Invalidator};
pub use redis::{RedisCache, RedisCacheConfig};
pub use store::{CacheHealth, CacheStore, DEFAULT_OPERATION_TIMEOUT, DEFAULT_SWEEP_TIMEOUT};
