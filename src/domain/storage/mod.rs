//! Storage domain - Record store abstraction, query model and soft-delete policy

mod entity;
mod query;
mod repository;
mod soft_delete;

pub use entity::{Resource, ResourceKind};
pub use query::{compare_values, Condition, Filter, FindQuery, Page, Record, SortOrder};
pub use repository::RecordStore;
pub use soft_delete::{
    DeleteAction, DeleteRequest, DeleteScope, SoftDeleteFilter, SOFT_DELETABLE, TOMBSTONE_FIELD,
};

#[cfg(test)]
pub use repository::mock;
