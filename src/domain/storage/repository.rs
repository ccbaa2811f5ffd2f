//! Durable record store trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::ResourceKind;
use super::query::{Filter, FindQuery, Record};
use crate::domain::DomainError;

/// Transactional CRUD over JSON records, one table per resource kind.
///
/// Unique-field violations must surface as `DomainError::Conflict`.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Returns the first record matching the filter
    async fn find(&self, kind: ResourceKind, filter: &Filter) -> Result<Option<Record>, DomainError>;

    /// Returns all records matching the query
    async fn find_many(&self, kind: ResourceKind, query: &FindQuery)
        -> Result<Vec<Record>, DomainError>;

    /// Counts records matching the filter
    async fn count(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError>;

    /// Inserts a new record; the record must carry an `id` field
    async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record, DomainError>;

    /// Merges `changes` into the first matching record, returning the result
    async fn update(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<Option<Record>, DomainError>;

    /// Merges `changes` into every matching record
    async fn update_many(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, DomainError>;

    /// Deletes the first matching record
    async fn delete(&self, kind: ResourceKind, filter: &Filter) -> Result<bool, DomainError>;

    /// Deletes every matching record
    async fn delete_many(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError>;

    /// Deletes every matching record, carrying extra field updates for
    /// stores that delete logically. Physical deletes ignore `data`.
    async fn delete_many_with(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        data: Record,
    ) -> Result<u64, DomainError> {
        let _ = data;
        self.delete_many(kind, filter).await
    }

    /// Verifies the store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn find(&self, kind: ResourceKind, filter: &Filter) -> Result<Option<Record>, DomainError> {
        (**self).find(kind, filter).await
    }

    async fn find_many(
        &self,
        kind: ResourceKind,
        query: &FindQuery,
    ) -> Result<Vec<Record>, DomainError> {
        (**self).find_many(kind, query).await
    }

    async fn count(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        (**self).count(kind, filter).await
    }

    async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record, DomainError> {
        (**self).insert(kind, record).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<Option<Record>, DomainError> {
        (**self).update(kind, filter, changes).await
    }

    async fn update_many(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, DomainError> {
        (**self).update_many(kind, filter, changes).await
    }

    async fn delete(&self, kind: ResourceKind, filter: &Filter) -> Result<bool, DomainError> {
        (**self).delete(kind, filter).await
    }

    async fn delete_many(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        (**self).delete_many(kind, filter).await
    }

    async fn delete_many_with(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        data: Record,
    ) -> Result<u64, DomainError> {
        (**self).delete_many_with(kind, filter, data).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        (**self).ping().await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// Store whose every call fails, standing in for a database outage
    #[derive(Debug, Default)]
    pub struct UnavailableStore;

    fn down() -> DomainError {
        DomainError::storage("connection refused")
    }

    #[async_trait]
    impl RecordStore for UnavailableStore {
        async fn find(&self, _: ResourceKind, _: &Filter) -> Result<Option<Record>, DomainError> {
            Err(down())
        }

        async fn find_many(&self, _: ResourceKind, _: &FindQuery) -> Result<Vec<Record>, DomainError> {
            Err(down())
        }

        async fn count(&self, _: ResourceKind, _: &Filter) -> Result<u64, DomainError> {
            Err(down())
        }

        async fn insert(&self, _: ResourceKind, _: Record) -> Result<Record, DomainError> {
            Err(down())
        }

        async fn update(
            &self,
            _: ResourceKind,
            _: &Filter,
            _: Record,
        ) -> Result<Option<Record>, DomainError> {
            Err(down())
        }

        async fn update_many(&self, _: ResourceKind, _: &Filter, _: Record) -> Result<u64, DomainError> {
            Err(down())
        }

        async fn delete(&self, _: ResourceKind, _: &Filter) -> Result<bool, DomainError> {
            Err(down())
        }

        async fn delete_many(&self, _: ResourceKind, _: &Filter) -> Result<u64, DomainError> {
            Err(down())
        }

        async fn ping(&self) -> Result<(), DomainError> {
            Err(down())
        }
    }
}
