//! Tag entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::storage::{Resource, ResourceKind};

/// Post tag. Name and slug are both unique; deletes are physical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Resource for Tag {
    const KIND: ResourceKind = ResourceKind::Tag;

    fn id(&self) -> Uuid {
        self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }
}

/// Tag list entry with the number of live posts carrying it.
///
/// The count is refreshed only when the tag list cache expires; post
/// mutations do not evict tag lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    #[serde(flatten)]
    pub tag: Tag,
    pub post_count: u64,
}
