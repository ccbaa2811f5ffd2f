//! Soft-delete policy: which kinds are tombstoned and how queries are rewritten

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::entity::ResourceKind;
use super::query::{Filter, Record};

/// Tombstone column shared by every soft-deletable kind
pub const TOMBSTONE_FIELD: &str = "deleted_at";

/// Kinds whose deletes become tombstone updates
pub const SOFT_DELETABLE: &[ResourceKind] = &[ResourceKind::Post];

/// How many records a delete targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    One,
    Many,
}

/// A delete as issued by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub filter: Filter,
    pub scope: DeleteScope,
    /// Extra field updates supplied alongside a bulk delete
    pub data: Option<Record>,
}

impl DeleteRequest {
    pub fn one(filter: Filter) -> Self {
        Self {
            filter,
            scope: DeleteScope::One,
            data: None,
        }
    }

    pub fn many(filter: Filter) -> Self {
        Self {
            filter,
            scope: DeleteScope::Many,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Record) -> Self {
        self.data = Some(data);
        self
    }
}

/// What a delete turns into after the policy is applied
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteAction {
    /// Physically remove the rows
    Remove { filter: Filter, scope: DeleteScope },
    /// Set the tombstone (merged into `data`) on the matching rows
    Tombstone {
        filter: Filter,
        scope: DeleteScope,
        data: Record,
    },
}

/// Query rewriting rules for soft-deletable kinds
#[derive(Debug, Clone)]
pub struct SoftDeleteFilter {
    field: String,
    kinds: Vec<ResourceKind>,
}

impl Default for SoftDeleteFilter {
    fn default() -> Self {
        Self::new(TOMBSTONE_FIELD, SOFT_DELETABLE.iter().copied())
    }
}

impl SoftDeleteFilter {
    pub fn new(field: impl Into<String>, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            field: field.into(),
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn applies_to(&self, kind: ResourceKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Hides tombstoned rows unless the caller already constrains the tombstone
    pub fn wrap_find(&self, kind: ResourceKind, filter: &Filter) -> Filter {
        let mut filter = filter.clone();

        if self.applies_to(kind) && !filter.mentions(&self.field) {
            filter = filter.is_null(self.field.clone());
        }

        filter
    }

    /// Rewrites deletes on soft-deletable kinds into tombstone updates
    pub fn wrap_delete(
        &self,
        kind: ResourceKind,
        request: DeleteRequest,
        now: DateTime<Utc>,
    ) -> DeleteAction {
        if !self.applies_to(kind) {
            return DeleteAction::Remove {
                filter: request.filter,
                scope: request.scope,
            };
        }

        // Already-tombstoned rows keep their first deletion time.
        let filter = self.wrap_find(kind, &request.filter);

        let mut data = request.data.unwrap_or_default();
        data.insert(self.field.clone(), Value::String(now.to_rfc3339()));

        DeleteAction::Tombstone {
            filter,
            scope: request.scope,
            data,
        }
    }
}
