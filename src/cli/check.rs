//! Check command

use crate::domain::storage::RecordStore;
use crate::infrastructure::cache::CacheHealth;
use crate::infrastructure::logging;

pub async fn run() -> anyhow::Result<()> {
    let config = crate::load_config();
    logging::init_logging(&config.logging);

    let state = crate::create_app_state(&config).await?;

    let cache = state.cache.ping().await;
    println!("cache ({}): {}", config.cache.backend, cache.as_str());

    match state.store.ping().await {
        Ok(()) => println!("store ({}): healthy", config.database.backend),
        Err(e) => anyhow::bail!("store ({}) unavailable: {}", config.database.backend, e),
    }

    if cache != CacheHealth::Healthy {
        tracing::warn!("Cache is {}; reads will fall back to the store", cache.as_str());
    }

    Ok(())
}
