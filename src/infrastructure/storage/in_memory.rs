//! In-memory record store implementation

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::storage::{
    compare_values, Filter, FindQuery, Record, RecordStore, ResourceKind, SortOrder,
};
use crate::domain::DomainError;

type Tables = HashMap<ResourceKind, Vec<Record>>;

/// Thread-safe in-memory record store
///
/// Rows keep insertion order. Unique fields are enforced across every row of
/// a table, tombstoned or not. Useful for testing and development; data is
/// lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, DomainError> {
        self.tables
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, DomainError> {
        self.tables
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Rejects `candidate` if another row already holds one of its unique values
    fn check_unique(
        kind: ResourceKind,
        rows: &[Record],
        candidate: &Record,
        skip: Option<usize>,
    ) -> Result<(), DomainError> {
        for field in kind.unique_fields() {
            let Some(value) = candidate.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };

            let taken = rows
                .iter()
                .enumerate()
                .any(|(i, row)| Some(i) != skip && row.get(*field) == Some(value));

            if taken {
                return Err(DomainError::conflict(format!(
                    "{} with {} {} already exists",
                    kind, field, value
                )));
            }
        }

        Ok(())
    }

    fn merge(row: &Record, changes: &Record) -> Record {
        let mut merged = row.clone();
        for (field, value) in changes {
            merged.insert(field.clone(), value.clone());
        }
        merged
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(&self, kind: ResourceKind, filter: &Filter) -> Result<Option<Record>, DomainError> {
        let tables = self.read()?;

        Ok(tables
            .get(&kind)
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)))
            .cloned())
    }

    async fn find_many(
        &self,
        kind: ResourceKind,
        query: &FindQuery,
    ) -> Result<Vec<Record>, DomainError> {
        let tables = self.read()?;

        let mut rows: Vec<Record> = tables
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, order)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(query.offset).take(limit).collect())
    }

    async fn count(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        let tables = self.read()?;

        Ok(tables
            .get(&kind)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).count())
            .unwrap_or(0) as u64)
    }

    async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record, DomainError> {
        if !matches!(record.get("id"), Some(Value::String(_))) {
            return Err(DomainError::validation(format!(
                "{} record is missing a string id",
                kind
            )));
        }

        let mut tables = self.write()?;
        let rows = tables.entry(kind).or_default();

        if rows.iter().any(|row| row.get("id") == record.get("id")) {
            return Err(DomainError::conflict(format!("{} id already exists", kind)));
        }
        Self::check_unique(kind, rows, &record, None)?;

        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<Option<Record>, DomainError> {
        let mut tables = self.write()?;
        let rows = tables.entry(kind).or_default();

        let Some(index) = rows.iter().position(|row| filter.matches(row)) else {
            return Ok(None);
        };

        let merged = Self::merge(&rows[index], &changes);
        Self::check_unique(kind, rows, &merged, Some(index))?;

        rows[index] = merged.clone();
        Ok(Some(merged))
    }

    async fn update_many(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, DomainError> {
        let mut tables = self.write()?;
        let rows = tables.entry(kind).or_default();

        // Stage on a copy so a conflict leaves the table untouched
        let mut staged = rows.clone();
        let mut updated = 0;

        for index in 0..staged.len() {
            if !filter.matches(&staged[index]) {
                continue;
            }

            let merged = Self::merge(&staged[index], &changes);
            Self::check_unique(kind, &staged, &merged, Some(index))?;
            staged[index] = merged;
            updated += 1;
        }

        *rows = staged;
        Ok(updated)
    }

    async fn delete(&self, kind: ResourceKind, filter: &Filter) -> Result<bool, DomainError> {
        let mut tables = self.write()?;
        let rows = tables.entry(kind).or_default();

        match rows.iter().position(|row| filter.matches(row)) {
            Some(index) => {
                rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        let mut tables = self.write()?;
        let rows = tables.entry(kind).or_default();

        let before = rows.len();
        rows.retain(|row| !filter.matches(row));

        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn category(id: &str, name: &str, slug: &str) -> Record {
        record(json!({"id": id, "name": name, "slug": slug}))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryRecordStore::new();
        store
            .insert(ResourceKind::Category, category("1", "Tech", "tech"))
            .await
            .unwrap();

        let found = store
            .find(ResourceKind::Category, &Filter::new().eq("slug", "tech"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().get("name"), Some(&json!("Tech")));

        let other_table = store
            .find(ResourceKind::Tag, &Filter::new().eq("slug", "tech"))
            .await
            .unwrap();
        assert!(other_table.is_none());
    }

    #[tokio::test]
    async fn test_insert_requires_id() {
        let store = InMemoryRecordStore::new();
        let result = store
            .insert(ResourceKind::Tag, record(json!({"name": "x"})))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_unique_fields_conflict() {
        let store = InMemoryRecordStore::new();
        store
            .insert(ResourceKind::Category, category("1", "Tech", "tech"))
            .await
            .unwrap();

        let same_slug = store
            .insert(ResourceKind::Category, category("2", "Other", "tech"))
            .await;
        assert!(same_slug.unwrap_err().is_conflict());

        let same_name = store
            .insert(ResourceKind::Category, category("3", "Tech", "tech-2"))
            .await;
        assert!(same_name.unwrap_err().is_conflict());

        // Comments carry no unique fields
        for id in ["a", "b"] {
            store
                .insert(ResourceKind::Comment, record(json!({"id": id, "body": "same"})))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_update_merges_and_checks_uniqueness() {
        let store = InMemoryRecordStore::new();
        store
            .insert(ResourceKind::Category, category("1", "Tech", "tech"))
            .await
            .unwrap();
        store
            .insert(ResourceKind::Category, category("2", "News", "news"))
            .await
            .unwrap();

        let updated = store
            .update(
                ResourceKind::Category,
                &Filter::new().eq("id", "1"),
                record(json!({"name": "Technology"})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("name"), Some(&json!("Technology")));
        assert_eq!(updated.get("slug"), Some(&json!("tech")));

        // Keeping its own slug is not a conflict
        store
            .update(
                ResourceKind::Category,
                &Filter::new().eq("id", "1"),
                record(json!({"slug": "tech"})),
            )
            .await
            .unwrap();

        let clash = store
            .update(
                ResourceKind::Category,
                &Filter::new().eq("id", "1"),
                record(json!({"slug": "news"})),
            )
            .await;
        assert!(clash.unwrap_err().is_conflict());

        let missing = store
            .update(
                ResourceKind::Category,
                &Filter::new().eq("id", "9"),
                record(json!({"name": "x"})),
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_many_is_all_or_nothing() {
        let store = InMemoryRecordStore::new();
        store
            .insert(ResourceKind::Tag, category("1", "a", "a"))
            .await
            .unwrap();
        store
            .insert(ResourceKind::Tag, category("2", "b", "b"))
            .await
            .unwrap();

        let result = store
            .update_many(ResourceKind::Tag, &Filter::new(), record(json!({"slug": "same"})))
            .await;
        assert!(result.unwrap_err().is_conflict());

        let untouched = store
            .count(ResourceKind::Tag, &Filter::new().eq("slug", "same"))
            .await
            .unwrap();
        assert_eq!(untouched, 0);

        let updated = store
            .update_many(ResourceKind::Tag, &Filter::new(), record(json!({"hidden": true})))
            .await
            .unwrap();
        assert_eq!(updated, 2);
    }

    #[tokio::test]
    async fn test_find_many_sorts_and_paginates() {
        let store = InMemoryRecordStore::new();
        for (id, rank) in [("1", 3), ("2", 1), ("3", 2), ("4", 5)] {
            store
                .insert(ResourceKind::Product, record(json!({"id": id, "rank": rank})))
                .await
                .unwrap();
        }

        let query = FindQuery::new(Filter::new())
            .order_by("rank", SortOrder::Asc)
            .paginate(1, 2);
        let rows = store.find_many(ResourceKind::Product, &query).await.unwrap();

        let ids: Vec<&Value> = rows.iter().filter_map(|r| r.get("id")).collect();
        assert_eq!(ids, vec![&json!("3"), &json!("1")]);
    }

    #[tokio::test]
    async fn test_delete_and_delete_many() {
        let store = InMemoryRecordStore::new();
        for (id, post) in [("1", "p"), ("2", "p"), ("3", "q")] {
            store
                .insert(ResourceKind::Comment, record(json!({"id": id, "post_id": post})))
                .await
                .unwrap();
        }

        assert!(store
            .delete(ResourceKind::Comment, &Filter::new().eq("id", "1"))
            .await
            .unwrap());
        assert!(!store
            .delete(ResourceKind::Comment, &Filter::new().eq("id", "1"))
            .await
            .unwrap());

        let removed = store
            .delete_many(ResourceKind::Comment, &Filter::new().eq("post_id", "p"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count(ResourceKind::Comment, &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hard_delete_releases_unique_values() {
        let store = InMemoryRecordStore::new();
        store
            .insert(ResourceKind::Product, record(json!({"id": "1", "slug": "artemis"})))
            .await
            .unwrap();
        store
            .delete(ResourceKind::Product, &Filter::new().eq("slug", "artemis"))
            .await
            .unwrap();

        assert!(store
            .insert(ResourceKind::Product, record(json!({"id": "2", "slug": "artemis"})))
            .await
            .is_ok());
    }
}
