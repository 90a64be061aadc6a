//! Views and likes bookkeeping.
//!
//! The cache doubles as a lightweight counter store here, not a durable
//! ledger: stats documents are TTL-less, created lazily, and left orphaned
//! when a post is deleted. Increments go through the store's atomic
//! [`UpdateOp`] so concurrent bumps cannot lose updates; the like cap is
//! enforced inside the same atomic step.

use std::collections::BTreeMap;
use std::sync::Arc;

use kindred_api_types::LikeTally;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheService, UpdateOp, keys};

pub const DEFAULT_MAX_LIKES_PER_USER: u32 = 10;

/// Stats document stored at `post:{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStats {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes_by_user: BTreeMap<String, u32>,
}

impl PostStats {
    pub fn empty(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            views: 0,
            likes_by_user: BTreeMap::new(),
        }
    }

    pub fn total_likes(&self) -> u64 {
        self.likes_by_user.values().map(|count| u64::from(*count)).sum()
    }

    pub fn likes_for(&self, user_hash: &str) -> u32 {
        self.likes_by_user.get(user_hash).copied().unwrap_or(0)
    }
}

pub struct PostStatsService {
    cache: Arc<CacheService>,
    max_likes_per_user: u32,
}

impl PostStatsService {
    pub fn new(cache: Arc<CacheService>, max_likes_per_user: u32) -> Self {
        Self {
            cache,
            max_likes_per_user,
        }
    }

    /// Current stats for `slug`, lazily initializing the zero document.
    ///
    /// The lazy init is idempotent under race: a concurrent init can only
    /// overwrite an identical zero state.
    pub async fn get_stats(&self, slug: &str) -> PostStats {
        let key = keys::stats_key(slug);

        if let Some(mut stats) = self.cache.get::<PostStats>(&key).await {
            stats.slug = slug.to_string();
            return stats;
        }

        let stats = PostStats::empty(slug);
        self.cache.set(&key, &stats, None).await;
        stats
    }

    /// Increment the view counter and return the updated stats.
    ///
    /// Degrades to the zero document if the store is unreachable — the
    /// increment is dropped, not queued.
    pub async fn increment_views(&self, slug: &str) -> PostStats {
        let key = keys::stats_key(slug);

        match self
            .cache
            .update(&key, UpdateOp::IncrField { field: "views" })
            .await
        {
            Some(doc) => Self::parse_stats(slug, doc),
            None => PostStats::empty(slug),
        }
    }

    pub async fn get_total_likes(&self, slug: &str) -> u64 {
        self.get_stats(slug).await.total_likes()
    }

    pub async fn get_likes_by_user(&self, slug: &str, user_hash: &str) -> u32 {
        self.get_stats(slug).await.likes_for(user_hash)
    }

    /// Increment the caller's like count unless it has reached the cap.
    ///
    /// At the cap the call is a silent no-op returning the unchanged totals;
    /// the caller cannot distinguish "counted" from "capped" by status.
    pub async fn increment_likes(&self, slug: &str, user_hash: &str) -> LikeTally {
        let key = keys::stats_key(slug);

        match self
            .cache
            .update(
                &key,
                UpdateOp::IncrMapEntry {
                    field: "likes_by_user",
                    member: user_hash.to_string(),
                    cap: self.max_likes_per_user,
                },
            )
            .await
        {
            Some(doc) => {
                let stats = Self::parse_stats(slug, doc);
                LikeTally {
                    total_likes: stats.total_likes(),
                    user_likes: stats.likes_for(user_hash),
                }
            }
            None => LikeTally {
                total_likes: 0,
                user_likes: 0,
            },
        }
    }

    pub fn max_likes_per_user(&self) -> u32 {
        self.max_likes_per_user
    }

    fn parse_stats(slug: &str, doc: serde_json::Value) -> PostStats {
        let mut stats: PostStats = serde_json::from_value(doc).unwrap_or_else(|_| PostStats::empty(slug));
        stats.slug = slug.to_string();
        stats
    }
}
