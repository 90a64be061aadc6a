#![allow(dead_code)]

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use kindred::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use kindred::domain::entities::PostRecord;
use kindred::domain::types::PostStatus;

pub fn sample_post(slug: &str, tags: &[&str]) -> PostRecord {
    PostRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: format!("Title for {slug}"),
        summary: format!("Summary for {slug}"),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        status: PostStatus::Published,
        published_at: Some(OffsetDateTime::now_utc()),
        deleted_at: None,
        metadata: serde_json::Value::Object(serde_json::Map::new()),
        created_at: OffsetDateTime::now_utc(),
        updated_at: OffsetDateTime::now_utc(),
    }
}

/// In-memory repository double with query accounting, standing in for the
/// Postgres layer.
pub struct StubPostsRepo {
    posts: RwLock<Vec<PostRecord>>,
    overlap_queries: AtomicUsize,
    slug_queries: AtomicUsize,
}

impl StubPostsRepo {
    pub fn new(posts: Vec<PostRecord>) -> Self {
        Self {
            posts: RwLock::new(posts),
            overlap_queries: AtomicUsize::new(0),
            slug_queries: AtomicUsize::new(0),
        }
    }

    /// Number of candidate (overlap) queries issued so far.
    pub fn overlap_queries(&self) -> usize {
        self.overlap_queries.load(Ordering::SeqCst)
    }

    pub fn slug_queries(&self) -> usize {
        self.slug_queries.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Vec<PostRecord> {
        self.posts.read().expect("posts lock").clone()
    }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().any(|tag| b.contains(tag))
}

#[async_trait]
impl PostsRepo for StubPostsRepo {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.slug_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot().into_iter().find(|post| post.slug == slug))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.snapshot().into_iter().find(|post| post.id == id))
    }

    async fn list_overlapping(
        &self,
        tags: &[String],
        exclude_slug: &str,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.overlap_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|post| {
                post.is_visible() && post.slug != exclude_slug && overlaps(tags, &post.tags)
            })
            .collect())
    }

    async fn list_posts(
        &self,
        include_deleted: bool,
        limit: u32,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|post| include_deleted || post.deleted_at.is_none())
            .take(limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl PostsWriteRepo for StubPostsRepo {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.write().expect("posts lock");
        if posts.iter().any(|post| post.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "posts_slug_key".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            summary: params.summary,
            tags: params.tags,
            status: params.status,
            published_at: params.published_at,
            deleted_at: None,
            metadata: params.metadata,
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.write().expect("posts lock");
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;

        post.title = params.title;
        post.summary = params.summary;
        post.tags = params.tags;
        post.status = params.status;
        post.published_at = params.published_at;
        post.metadata = params.metadata;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.write().expect("posts lock");
        let post = posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;

        post.deleted_at = Some(OffsetDateTime::now_utc());
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn restore_post(&self, id: Uuid) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.write().expect("posts lock");
        let post = posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;

        post.deleted_at = None;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }
}
