//! Comment domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::storage::{Resource, ResourceKind};

/// Reader comment on a post. Comments have no slug; deletes are physical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author_name: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            post_id,
            author_name: author_name.into(),
            body: body.into(),
            approved: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Resource for Comment {
    const KIND: ResourceKind = ResourceKind::Comment;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommentValidationError {
    #[error("Comment author cannot be empty")]
    EmptyAuthor,

    #[error("Comment body cannot be empty")]
    EmptyBody,

    #[error("Comment body exceeds maximum length of {0} characters")]
    BodyTooLong(usize),
}

const MAX_BODY_LENGTH: usize = 5000;

pub fn validate_comment(author_name: &str, body: &str) -> Result<(), CommentValidationError> {
    if author_name.trim().is_empty() {
        return Err(CommentValidationError::EmptyAuthor);
    }

    validate_comment_body(body)
}

pub fn validate_comment_body(body: &str) -> Result<(), CommentValidationError> {
    if body.trim().is_empty() {
        return Err(CommentValidationError::EmptyBody);
    }

    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(CommentValidationError::BodyTooLong(MAX_BODY_LENGTH));
    }

    Ok(())
}
