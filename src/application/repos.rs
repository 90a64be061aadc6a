//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::PostRecord;
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    pub metadata: Value,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
    pub metadata: Value,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    /// Published, non-deleted posts whose tag sets intersect `tags`,
    /// excluding `exclude_slug`. Candidate order is stable (most recently
    /// published first) and is the de-facto tie-break for equal similarity.
    async fn list_overlapping(
        &self,
        tags: &[String],
        exclude_slug: &str,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Admin listing, newest first.
    async fn list_posts(
        &self,
        include_deleted: bool,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Soft delete: stamps `deleted_at`, preserving stats and tags.
    async fn delete_post(&self, id: Uuid) -> Result<PostRecord, RepoError>;

    /// Clears `deleted_at`.
    async fn restore_post(&self, id: Uuid) -> Result<PostRecord, RepoError>;
}
