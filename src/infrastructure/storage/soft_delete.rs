//! Record store decorator applying the soft-delete policy

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::domain::storage::{
    DeleteAction, DeleteRequest, DeleteScope, Filter, FindQuery, Record, RecordStore,
    ResourceKind, SoftDeleteFilter,
};
use crate::domain::DomainError;

/// Wraps any [`RecordStore`] so that tombstoned rows are invisible to reads
/// and deletes on soft-deletable kinds become tombstone updates.
///
/// Updates are filtered like reads: a tombstoned row can only be changed
/// by a caller that constrains the tombstone field explicitly.
#[derive(Debug)]
pub struct SoftDeleteStore<S> {
    inner: S,
    policy: SoftDeleteFilter,
}

impl<S: RecordStore> SoftDeleteStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, SoftDeleteFilter::default())
    }

    pub fn with_policy(inner: S, policy: SoftDeleteFilter) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &SoftDeleteFilter {
        &self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Executes a delete request, returning the number of affected rows
    async fn execute_delete(
        &self,
        kind: ResourceKind,
        request: DeleteRequest,
    ) -> Result<u64, DomainError> {
        match self.policy.wrap_delete(kind, request, Utc::now()) {
            DeleteAction::Remove {
                filter,
                scope: DeleteScope::One,
            } => Ok(u64::from(self.inner.delete(kind, &filter).await?)),
            DeleteAction::Remove {
                filter,
                scope: DeleteScope::Many,
            } => self.inner.delete_many(kind, &filter).await,
            DeleteAction::Tombstone {
                filter,
                scope: DeleteScope::One,
                data,
            } => {
                let tombstoned = self.inner.update(kind, &filter, data).await?;
                debug!(kind = %kind, tombstoned = tombstoned.is_some(), "Soft-deleted record");
                Ok(u64::from(tombstoned.is_some()))
            }
            DeleteAction::Tombstone {
                filter,
                scope: DeleteScope::Many,
                data,
            } => {
                let tombstoned = self.inner.update_many(kind, &filter, data).await?;
                debug!(kind = %kind, tombstoned, "Soft-deleted records");
                Ok(tombstoned)
            }
        }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for SoftDeleteStore<S> {
    async fn find(&self, kind: ResourceKind, filter: &Filter) -> Result<Option<Record>, DomainError> {
        let filter = self.policy.wrap_find(kind, filter);
        self.inner.find(kind, &filter).await
    }

    async fn find_many(
        &self,
        kind: ResourceKind,
        query: &FindQuery,
    ) -> Result<Vec<Record>, DomainError> {
        let query = FindQuery {
            filter: self.policy.wrap_find(kind, &query.filter),
            ..query.clone()
        };
        self.inner.find_many(kind, &query).await
    }

    async fn count(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        let filter = self.policy.wrap_find(kind, filter);
        self.inner.count(kind, &filter).await
    }

    async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record, DomainError> {
        self.inner.insert(kind, record).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<Option<Record>, DomainError> {
        let filter = self.policy.wrap_find(kind, filter);
        self.inner.update(kind, &filter, changes).await
    }

    async fn update_many(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, DomainError> {
        let filter = self.policy.wrap_find(kind, filter);
        self.inner.update_many(kind, &filter, changes).await
    }

    async fn delete(&self, kind: ResourceKind, filter: &Filter) -> Result<bool, DomainError> {
        let affected = self
            .execute_delete(kind, DeleteRequest::one(filter.clone()))
            .await?;
        Ok(affected > 0)
    }

    async fn delete_many(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        self.execute_delete(kind, DeleteRequest::many(filter.clone()))
            .await
    }

    async fn delete_many_with(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        data: Record,
    ) -> Result<u64, DomainError> {
        self.execute_delete(kind, DeleteRequest::many(filter.clone()).with_data(data))
            .await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.inner.ping().await
    }
}
