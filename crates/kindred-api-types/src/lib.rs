//! Shared request and response types for the Kindred engagement API.
//!
//! These types are serialized on the wire by the server and may be reused by
//! clients. Enabling the `sqlx` feature adds database derives so the server
//! can bind `PostStatus` directly in queries.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Publication state of a post (mirrors the Postgres enum `post_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "post_status", rename_all = "snake_case"))]
pub enum PostStatus {
    Draft,
    Published,
}

/// One entry in a related-posts ranking.
///
/// `similarity` is the Jaccard index of the two posts' tag sets and is always
/// within `[0, 1]`; `common_tag_count` is the size of the tag intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPost {
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<OffsetDateTime>,
    pub common_tag_count: u32,
    pub similarity: f64,
}

/// One entry in the popular-posts ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularPost {
    pub slug: String,
    pub views: u64,
}

/// Aggregated engagement counters for a post, as seen by one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStatsView {
    pub slug: String,
    pub views: u64,
    pub total_likes: u64,
    pub user_likes: u32,
}

/// Result of a like increment: the post total and the caller's own count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeTally {
    pub total_likes: u64,
    pub user_likes: u32,
}

/// Total likes for a post across all callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalLikes {
    pub total_likes: u64,
}

/// The caller's own like count for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLikes {
    pub likes: u32,
}

/// Admin request to create a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreateRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Admin request to replace a post's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}
