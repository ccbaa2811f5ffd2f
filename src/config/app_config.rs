use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheType};
use crate::infrastructure::services::CacheTtls;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `[cache]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `memory` or `redis`
    pub backend: String,
    pub redis_url: String,
    pub key_prefix: Option<String>,
    /// Upper bound for a single cache call before it is treated as a miss
    pub operation_timeout_ms: u64,
    /// Budget for a list sweep (pattern delete), which spans many round-trips
    pub sweep_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub entity_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub aggregate_ttl_secs: u64,
    pub max_capacity: Option<u64>,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `memory` or `postgres`
    pub backend: String,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        let ttls = CacheTtls::default();

        Self {
            backend: "memory".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: None,
            operation_timeout_ms: 250,
            sweep_timeout_ms: 2000,
            connect_timeout_ms: 2000,
            entity_ttl_secs: ttls.entity.as_secs(),
            list_ttl_secs: ttls.list.as_secs(),
            aggregate_ttl_secs: ttls.aggregate.as_secs(),
            max_capacity: None,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let postgres = PostgresConfig::default();

        Self {
            backend: "memory".to_string(),
            url: postgres.url,
            max_connections: postgres.max_connections,
            min_connections: postgres.min_connections,
            connect_timeout_secs: postgres.connect_timeout_secs,
            idle_timeout_secs: postgres.idle_timeout_secs,
        }
    }
}

impl CacheSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_millis(self.sweep_timeout_ms)
    }

    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            entity: Duration::from_secs(self.entity_ttl_secs),
            list: Duration::from_secs(self.list_ttl_secs),
            aggregate: Duration::from_secs(self.aggregate_ttl_secs),
        }
    }

    /// Backend configuration for the cache factory
    pub fn backend_config(&self) -> Result<CacheConfig, DomainError> {
        let mut config = match self.backend.parse::<CacheType>()? {
            CacheType::InMemory => CacheConfig::in_memory(),
            CacheType::Redis => CacheConfig::redis(&self.redis_url),
        };

        if let Some(prefix) = &self.key_prefix {
            config = config.with_key_prefix(prefix);
        }
        if let Some(capacity) = self.max_capacity {
            config = config.with_max_capacity(capacity);
        }

        // The in-memory lifetime cap must not cut any configured TTL short
        let ttls = self.ttls();
        let longest = ttls.entity.max(ttls.list).max(ttls.aggregate);

        Ok(config
            .with_default_ttl(longest)
            .with_connection_timeout(Duration::from_millis(self.connect_timeout_ms)))
    }
}

impl DatabaseSettings {
    /// Backend configuration for the store factory
    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        match self.backend.parse::<StorageType>()? {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => Ok(StorageConfig::postgres(PostgresConfig {
                url: self.url.clone(),
                max_connections: self.max_connections,
                min_connections: self.min_connections,
                connect_timeout_secs: self.connect_timeout_secs,
                idle_timeout_secs: self.idle_timeout_secs,
            })),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
