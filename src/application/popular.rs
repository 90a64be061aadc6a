//! Popular posts: top-N by view count.

use std::sync::Arc;

use kindred_api_types::PopularPost;

use crate::cache::{CacheService, keys};

use super::stats::PostStats;

pub struct PopularPostsService {
    cache: Arc<CacheService>,
}

impl PopularPostsService {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Every tracked stats document, sorted descending by views, truncated.
    ///
    /// Materializes the full set and sorts in-process rather than keeping a
    /// store-side sorted set. At personal-blog volume the scan is tens of
    /// keys; revisit if the catalog grows past a few thousand posts.
    pub async fn get_popular_posts(&self, limit: usize) -> Vec<PopularPost> {
        let mut entries = Vec::new();

        for key in self.cache.scan(keys::POST_PREFIX).await {
            let Some(slug) = keys::stats_slug(&key) else {
                continue;
            };
            let slug = slug.to_string();

            if let Some(stats) = self.cache.get::<PostStats>(&key).await {
                entries.push(PopularPost {
                    slug,
                    views: stats.views,
                });
            }
        }

        entries.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.slug.cmp(&b.slug)));
        entries.truncate(limit);
        entries
    }
}
