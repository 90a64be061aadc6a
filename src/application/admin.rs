//! Admin write path for posts.
//!
//! The one place posts are mutated, and therefore the one place invalidation
//! triggers fire. Tags are normalized (slugified, deduplicated) on the way
//! in so similarity scoring compares like with like.

use std::sync::Arc;

use kindred_api_types::{PostCreateRequest, PostUpdateRequest};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::cache::InvalidationTrigger;
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::slug::derive_slug;
use crate::domain::types::{PostStatus, PostStatusExt};

use super::error::AppError;
use super::repos::{CreatePostParams, PostsRepo, PostsWriteRepo, UpdatePostParams};

const MAX_SLUG_ATTEMPTS: u32 = 32;

pub struct AdminPostService {
    posts: Arc<dyn PostsRepo>,
    writes: Arc<dyn PostsWriteRepo>,
    trigger: Arc<InvalidationTrigger>,
}

impl AdminPostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writes: Arc<dyn PostsWriteRepo>,
        trigger: Arc<InvalidationTrigger>,
    ) -> Self {
        Self {
            posts,
            writes,
            trigger,
        }
    }

    pub async fn list_posts(
        &self,
        include_deleted: bool,
        limit: u32,
    ) -> Result<Vec<PostRecord>, AppError> {
        Ok(self.posts.list_posts(include_deleted, limit).await?)
    }

    pub async fn load_post(&self, id: Uuid) -> Result<Option<PostRecord>, AppError> {
        Ok(self.posts.find_by_id(id).await?)
    }

    pub async fn create_post(&self, request: PostCreateRequest) -> Result<PostRecord, AppError> {
        if request.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty").into());
        }

        let slug = self.unique_slug(&request.title).await?;
        let tags = normalize_tags(&request.tags);
        let published_at = resolve_published_at(request.status, request.published_at);

        let post = self
            .writes
            .create_post(CreatePostParams {
                slug,
                title: request.title,
                summary: request.summary,
                tags,
                status: request.status,
                published_at,
                metadata: request.metadata,
            })
            .await?;

        info!(slug = %post.slug, status = post.status.as_str(), "Post created");

        if post.status == PostStatus::Published {
            self.trigger.post_upserted(&post.slug, &post.tags).await;
        }

        Ok(post)
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        request: PostUpdateRequest,
    ) -> Result<PostRecord, AppError> {
        if request.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty").into());
        }

        let before = self.posts.find_by_id(id).await?.ok_or(AppError::NotFound)?;

        let tags = normalize_tags(&request.tags);
        let published_at = resolve_published_at(request.status, request.published_at);

        let post = self
            .writes
            .update_post(UpdatePostParams {
                id,
                title: request.title,
                summary: request.summary,
                tags,
                status: request.status,
                published_at,
                metadata: request.metadata,
            })
            .await?;

        info!(slug = %post.slug, status = post.status.as_str(), "Post updated");

        if ranking_inputs_changed(&before, &post) {
            // Union of old and new tags so posts that only overlapped the
            // previous tag set are purged too.
            let mut tags = before.tags.clone();
            for tag in &post.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
            self.trigger.post_upserted(&post.slug, &tags).await;
        }

        Ok(post)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<PostRecord, AppError> {
        let post = self.writes.delete_post(id).await?;
        info!(slug = %post.slug, "Post deleted");

        self.trigger.post_deleted(&post.slug, &post.tags).await;
        Ok(post)
    }

    pub async fn restore_post(&self, id: Uuid) -> Result<PostRecord, AppError> {
        let post = self.writes.restore_post(id).await?;
        info!(slug = %post.slug, "Post restored");

        self.trigger.post_restored(&post.slug, &post.tags).await;
        Ok(post)
    }

    /// Derive a slug from the title, suffixing until it is free.
    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let base = derive_slug(title).map_err(|err| AppError::validation(err.to_string()))?;

        let mut candidate = base.clone();
        let mut attempt = 1;
        while self.posts.find_by_slug(&candidate).await?.is_some() {
            attempt += 1;
            if attempt > MAX_SLUG_ATTEMPTS {
                return Err(AppError::validation(format!(
                    "exhausted attempts to find a unique slug for `{base}`"
                )));
            }
            candidate = format!("{base}-{attempt}");
        }

        Ok(candidate)
    }
}

/// Cached rankings embed title, summary, tags, and status; any of them
/// shifting can leave stale entries behind.
fn ranking_inputs_changed(before: &PostRecord, after: &PostRecord) -> bool {
    before.tags != after.tags
        || before.status != after.status
        || before.title != after.title
        || before.summary != after.summary
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized = Vec::with_capacity(tags.len());
    for tag in tags {
        let Ok(tag) = derive_slug(tag) else {
            continue;
        };
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

fn resolve_published_at(
    status: PostStatus,
    requested: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match (status, requested) {
        (PostStatus::Published, None) => Some(OffsetDateTime::now_utc()),
        (_, requested) => requested,
    }
}
