//! Related-posts ranking with cache-aside TTL caching.
//!
//! The read path: per-request memo → TTL cache → recompute. A cached entry
//! holds the full computation (up to `cache_limit` entries), so callers with
//! different limits share one computation and one database query.

use std::sync::Arc;
use std::time::Duration;

use kindred_api_types::RelatedPost;
use metrics::counter;
use tracing::debug;

use crate::cache::{CacheService, keys};
use crate::domain::similarity::{common_tag_count, jaccard};

use super::memo::RequestMemo;
use super::repos::{PostsRepo, RepoError};

const MEMO_OP: &str = "related_posts";

pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;
pub const DEFAULT_CACHE_LIMIT: usize = 4;
pub const DEFAULT_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct RelatedPostsConfig {
    /// Candidates scoring below this are excluded from the ranking.
    pub min_similarity: f64,
    /// Entries computed and cached per post; callers are clamped to it.
    pub cache_limit: usize,
    /// Lifetime of a cached ranking; the consistency backstop for anything
    /// the opportunistic invalidation misses.
    pub ttl: Duration,
}

impl Default for RelatedPostsConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            cache_limit: DEFAULT_CACHE_LIMIT,
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
        }
    }
}

pub struct RelatedPostsService {
    posts: Arc<dyn PostsRepo>,
    cache: Arc<CacheService>,
    config: RelatedPostsConfig,
}

impl RelatedPostsService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        cache: Arc<CacheService>,
        config: RelatedPostsConfig,
    ) -> Self {
        Self {
            posts,
            cache,
            config,
        }
    }

    /// Top `limit` posts related to `slug`, most similar first.
    ///
    /// A missing or untagged post yields an empty ranking — there is no
    /// similarity basis, and callers should not treat that as a failure.
    /// Database errors propagate; cache failures degrade to recomputation.
    pub async fn get_related_posts(
        &self,
        slug: &str,
        limit: usize,
        memo: Option<&RequestMemo>,
    ) -> Result<Vec<RelatedPost>, RepoError> {
        let limit = limit.clamp(1, self.config.cache_limit);

        if let Some(memo) = memo
            && let Some(ranked) = memo.get::<Vec<RelatedPost>>(MEMO_OP, slug)
        {
            return Ok(truncated(ranked, limit));
        }

        let key = keys::related_key(slug);

        if let Some(ranked) = self.cache.get::<Vec<RelatedPost>>(&key).await {
            if let Some(memo) = memo {
                memo.put(MEMO_OP, slug, &ranked);
            }
            return Ok(truncated(ranked, limit));
        }

        let ranked = self.compute(slug).await?;
        counter!("kindred_related_recompute_total").increment(1);

        self.cache.set(&key, &ranked, Some(self.config.ttl)).await;
        if let Some(memo) = memo {
            memo.put(MEMO_OP, slug, &ranked);
        }

        Ok(truncated(ranked, limit))
    }

    /// Score and rank the overlap neighborhood of `slug`.
    async fn compute(&self, slug: &str) -> Result<Vec<RelatedPost>, RepoError> {
        let Some(target) = self.posts.find_by_slug(slug).await? else {
            debug!(slug, "Related ranking requested for unknown post");
            return Ok(Vec::new());
        };

        if target.tags.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.posts.list_overlapping(&target.tags, slug).await?;

        let mut ranked: Vec<RelatedPost> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let similarity = jaccard(&target.tags, &candidate.tags);
                if similarity < self.config.min_similarity {
                    return None;
                }

                let common = common_tag_count(&target.tags, &candidate.tags);
                Some(RelatedPost {
                    slug: candidate.slug,
                    title: candidate.title,
                    summary: candidate.summary,
                    published_at: candidate.published_at,
                    common_tag_count: common as u32,
                    similarity,
                })
            })
            .collect();

        // Stable sort: equal scores keep candidate fetch order.
        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.config.cache_limit);

        Ok(ranked)
    }
}

fn truncated(mut ranked: Vec<RelatedPost>, limit: usize) -> Vec<RelatedPost> {
    ranked.truncate(limit);
    ranked
}
