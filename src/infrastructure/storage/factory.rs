//! Storage factory for runtime store selection

use std::sync::Arc;

use crate::domain::storage::RecordStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryRecordStore;
use super::postgres::{PostgresConfig, PostgresRecordStore};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl std::str::FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(DomainError::configuration(format!(
                "Unknown storage type: {}. Valid types: memory, postgres",
                other
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres(PostgresConfig),
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates a PostgreSQL storage configuration
    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating the raw durable store
#[derive(Debug)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a store based on the configuration. The result is the raw
    /// store; services wrap it with the soft-delete decorator themselves.
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryRecordStore::new())),
            StorageConfig::Postgres(pg_config) => {
                let store = PostgresRecordStore::connect(pg_config).await?;
                store.ensure_tables().await?;
                Ok(Arc::new(store))
            }
        }
    }
}
