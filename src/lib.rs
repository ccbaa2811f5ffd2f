//! Inkwell CMS
//!
//! Content backend for blogs and storefronts with:
//! - A fail-open read-through cache (in-memory or Redis)
//! - Deterministic cache keys with prefix-pattern list invalidation
//! - Transparent soft delete for posts
//! - In-memory or PostgreSQL record storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use api::state::AppState;
use domain::DomainError;
use infrastructure::cache::{CacheFactory, CacheStore};
use infrastructure::services::ServiceContext;
use infrastructure::storage::StoreFactory;
use std::sync::Arc;
use tracing::info;

/// Loads `.env` and the layered configuration, falling back to defaults
pub fn load_config() -> AppConfig {
    dotenvy::dotenv().ok();

    AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    })
}

/// Builds the service context described by `config`
pub async fn create_service_context(
    config: &AppConfig,
) -> Result<(Arc<dyn domain::RecordStore>, ServiceContext), DomainError> {
    let storage = config.database.storage_config()?;
    info!(backend = %config.database.backend, "Connecting record store");
    let store = StoreFactory::create(&storage).await?;

    let cache_config = config.cache.backend_config()?;
    info!(backend = %cache_config.cache_type, "Connecting cache");

    // Startup requires a reachable cache; later outages are fail-open
    let backend = CacheFactory::new().create(&cache_config).await?;
    let cache = CacheStore::new(backend)
        .with_timeout(config.cache.operation_timeout())
        .with_sweep_timeout(config.cache.sweep_timeout());

    let ctx = ServiceContext::new(store.clone(), cache).with_ttls(config.cache.ttls());

    Ok((store, ctx))
}

/// Builds the HTTP application state from configuration
pub async fn create_app_state(config: &AppConfig) -> Result<AppState, DomainError> {
    let (store, ctx) = create_service_context(config).await?;
    Ok(AppState::new(store, ctx))
}
