//! Storage infrastructure - record stores and the soft-delete decorator

mod factory;
mod in_memory;
mod postgres;
mod soft_delete;

pub use factory::{StorageConfig, StorageType, StoreFactory};
pub use in_memory::InMemoryRecordStore;
pub use postgres::{PostgresConfig, PostgresRecordStore};
pub use soft_delete::SoftDeleteStore;
