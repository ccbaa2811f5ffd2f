//! Resource kinds and the typed entity <-> record bridge

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::query::Record;
use crate::domain::DomainError;

/// Every resource type persisted by the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Post,
    Category,
    Tag,
    Product,
    User,
    Comment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Post,
        Self::Category,
        Self::Tag,
        Self::Product,
        Self::User,
        Self::Comment,
    ];

    /// Singular name, used as the cache namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Product => "product",
            Self::User => "user",
            Self::Comment => "comment",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Category => "categories",
            Self::Tag => "tags",
            Self::Product => "products",
            Self::User => "users",
            Self::Comment => "comments",
        }
    }

    /// Fields that must be unique across every row of the table
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Post => &["slug"],
            Self::Category => &["slug", "name"],
            Self::Tag => &["slug", "name"],
            Self::Product => &["slug"],
            Self::User => &["username", "email"],
            Self::Comment => &[],
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for typed entities stored as JSON records
pub trait Resource: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: ResourceKind;

    fn id(&self) -> Uuid;

    /// Human-readable unique slug, if the resource has one
    fn slug(&self) -> Option<&str> {
        None
    }

    fn to_record(&self) -> Result<Record, DomainError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(DomainError::internal(format!(
                "{} did not serialize to an object",
                Self::KIND
            ))),
            Err(e) => Err(DomainError::internal(format!(
                "Failed to serialize {}: {}",
                Self::KIND,
                e
            ))),
        }
    }

    fn from_record(record: Record) -> Result<Self, DomainError> {
        serde_json::from_value(serde_json::Value::Object(record)).map_err(|e| {
            DomainError::storage(format!("Failed to deserialize {}: {}", Self::KIND, e))
        })
    }
}
