//! Invalidation consumer.
//!
//! Drains the event queue and purges related-post cache entries affected by
//! each mutation: the mutated post's own entry, plus (best effort) the
//! entries of posts whose tag sets overlap it — those rankings may list the
//! mutated post. No reverse-dependency graph is walked; anything missed is
//! reconciled by the 24-hour entry TTL.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{debug, warn};

use crate::application::repos::PostsRepo;

use super::config::CacheConfig;
use super::events::{CacheEvent, EventQueue};
use super::keys;
use super::service::CacheService;

pub struct InvalidationConsumer {
    config: CacheConfig,
    cache: Arc<CacheService>,
    posts: Arc<dyn PostsRepo>,
    queue: Arc<EventQueue>,
}

impl InvalidationConsumer {
    pub fn new(
        config: CacheConfig,
        cache: Arc<CacheService>,
        posts: Arc<dyn PostsRepo>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            config,
            cache,
            posts,
            queue,
        }
    }

    /// Drain one batch of events and purge the affected cache entries.
    ///
    /// Purging is best effort throughout: repository errors are logged and
    /// skipped (the write that produced the event already succeeded, and the
    /// TTL bounds staleness), and delete errors are contained by the cache
    /// service.
    pub async fn consume(&self) {
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return;
        }

        let start = Instant::now();
        let mut purged: HashSet<String> = HashSet::new();

        for event in &events {
            self.collect_affected(event, &mut purged).await;
        }

        for slug in &purged {
            self.cache.delete(&keys::related_key(slug)).await;
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!("kindred_invalidation_consume_ms").record(elapsed_ms);
        debug!(
            events = events.len(),
            purged = purged.len(),
            elapsed_ms,
            "Invalidation batch consumed"
        );
    }

    async fn collect_affected(&self, event: &CacheEvent, purged: &mut HashSet<String>) {
        let slug = event.kind.slug();
        let tags = event.kind.tags();

        purged.insert(slug.to_string());

        if tags.is_empty() {
            return;
        }

        match self.posts.list_overlapping(tags, slug).await {
            Ok(neighbors) => {
                for neighbor in neighbors {
                    purged.insert(neighbor.slug);
                }
            }
            Err(err) => {
                warn!(
                    slug,
                    error = %err,
                    "Overlap query failed during invalidation; TTL will reconcile"
                );
            }
        }
    }
}
