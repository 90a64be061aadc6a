//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::PostStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    /// Stored as `text[]`; treated as a set (order and duplicates carry no
    /// meaning).
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    /// Soft-delete marker; restore clears it.
    pub deleted_at: Option<OffsetDateTime>,
    pub metadata: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    /// A post is publicly visible when published and not soft-deleted.
    pub fn is_visible(&self) -> bool {
        self.status == PostStatus::Published && self.deleted_at.is_none()
    }
}
