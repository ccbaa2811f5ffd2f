//! PostgreSQL record store with connection pooling

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;

use crate::domain::storage::{
    Condition, Filter, FindQuery, Record, RecordStore, ResourceKind, SortOrder,
};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/inkwell".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// PostgreSQL record store
///
/// One table per resource kind with `(id, data JSONB, created_at)` columns.
/// Unique fields are enforced by expression indexes over `data`, so
/// tombstoned rows keep holding their values.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl Debug for PostgresRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRecordStore")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

fn storage_error(context: &str, e: sqlx::Error) -> DomainError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::conflict(format!("{}: {}", context, db.message()))
        }
        _ => DomainError::storage(format!("{}: {}", context, e)),
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Appends ` WHERE ...` for the filter; an empty filter matches everything
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    builder.push(" WHERE TRUE");

    for condition in filter.conditions() {
        builder.push(" AND ");

        match condition {
            Condition::Eq(field, value) => {
                builder
                    .push("data -> ")
                    .push_bind(field.clone())
                    .push(" = ")
                    .push_bind(Json(value.clone()));
            }
            Condition::IsNull(field) => {
                builder
                    .push("COALESCE(data -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb) = 'null'::jsonb");
            }
            Condition::NotNull(field) => {
                builder
                    .push("COALESCE(data -> ")
                    .push_bind(field.clone())
                    .push(", 'null'::jsonb) <> 'null'::jsonb");
            }
            Condition::Contains(field, value) => {
                builder
                    .push("data -> ")
                    .push_bind(field.clone())
                    .push(" @> ")
                    .push_bind(Json(Value::Array(vec![value.clone()])));
            }
            Condition::Search(fields, term) => {
                let pattern = format!("%{}%", escape_like(term));
                builder.push("(FALSE");
                for field in fields {
                    builder
                        .push(" OR data ->> ")
                        .push_bind(field.clone())
                        .push(" ILIKE ")
                        .push_bind(pattern.clone());
                }
                builder.push(")");
            }
        }
    }
}

/// Appends a ` WHERE id = (...)` clause targeting the first matching row
fn push_first_match(builder: &mut QueryBuilder<'_, Postgres>, table: &str, filter: &Filter) {
    builder.push(format!(" WHERE id = (SELECT id FROM {}", table));
    push_filter(builder, filter);
    builder.push(" ORDER BY created_at, id LIMIT 1)");
}

fn row_to_record(row: &PgRow) -> Result<Record, DomainError> {
    let Json(data): Json<Value> = row
        .try_get("data")
        .map_err(|e| storage_error("Failed to read record", e))?;

    match data {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::storage(format!(
            "Stored record is not an object: {}",
            other
        ))),
    }
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with the configured pool settings
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates every resource table and its unique indexes
    pub async fn ensure_tables(&self) -> Result<(), DomainError> {
        for kind in ResourceKind::ALL {
            let table = kind.table();

            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    data JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                table
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to create table", e))?;

            for field in kind.unique_fields() {
                sqlx::query(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{field}_key ON {table} ((data ->> '{field}'))"
                ))
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to create unique index", e))?;
            }
        }

        info!("PostgreSQL record tables ready");
        Ok(())
    }

    fn changes_json(changes: Record) -> Json<Value> {
        Json(Value::Object(changes))
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn find(&self, kind: ResourceKind, filter: &Filter) -> Result<Option<Record>, DomainError> {
        let mut builder = QueryBuilder::new(format!("SELECT data FROM {}", kind.table()));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at, id LIMIT 1");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to find record", e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_many(
        &self,
        kind: ResourceKind,
        query: &FindQuery,
    ) -> Result<Vec<Record>, DomainError> {
        let mut builder = QueryBuilder::new(format!("SELECT data FROM {}", kind.table()));
        push_filter(&mut builder, &query.filter);

        match &query.order_by {
            Some((field, order)) => {
                builder.push(" ORDER BY data -> ").push_bind(field.clone());
                builder.push(match order {
                    SortOrder::Asc => " ASC NULLS FIRST",
                    SortOrder::Desc => " DESC NULLS LAST",
                });
                builder.push(", id");
            }
            None => {
                builder.push(" ORDER BY created_at, id");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        builder.push(" OFFSET ").push_bind(query.offset as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to list records", e))?;

        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) AS count FROM {}", kind.table()));
        push_filter(&mut builder, filter);

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to count records", e))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| storage_error("Failed to read count", e))?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, kind: ResourceKind, record: Record) -> Result<Record, DomainError> {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::validation(format!("{} record is missing a string id", kind))
            })?;

        sqlx::query(&format!("INSERT INTO {} (id, data) VALUES ($1, $2)", kind.table()))
            .bind(&id)
            .bind(Json(Value::Object(record.clone())))
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to insert {}", kind), e))?;

        Ok(record)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<Option<Record>, DomainError> {
        let table = kind.table();
        let mut builder = QueryBuilder::new(format!("UPDATE {} SET data = data || ", table));
        builder.push_bind(Self::changes_json(changes));
        push_first_match(&mut builder, table, filter);
        builder.push(" RETURNING data");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to update {}", kind), e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn update_many(
        &self,
        kind: ResourceKind,
        filter: &Filter,
        changes: Record,
    ) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::new(format!("UPDATE {} SET data = data || ", kind.table()));
        builder.push_bind(Self::changes_json(changes));
        push_filter(&mut builder, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to update {} records", kind), e))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, kind: ResourceKind, filter: &Filter) -> Result<bool, DomainError> {
        let table = kind.table();
        let mut builder = QueryBuilder::new(format!("DELETE FROM {}", table));
        push_first_match(&mut builder, table, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to delete {}", kind), e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, kind: ResourceKind, filter: &Filter) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::new(format!("DELETE FROM {}", kind.table()));
        push_filter(&mut builder, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("Failed to delete {} records", kind), e))?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("PostgreSQL ping failed", e))?;

        Ok(())
    }
}
