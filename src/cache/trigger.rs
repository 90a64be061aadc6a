//! Invalidation trigger.
//!
//! High-level API the write path uses to publish cache events; events are
//! consumed immediately so the common case (one edit, one purge) completes
//! before the admin response is returned.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::consumer::InvalidationConsumer;
use super::events::{EventKind, EventQueue};

pub struct InvalidationTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<InvalidationConsumer>,
}

impl InvalidationTrigger {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        consumer: Arc<InvalidationConsumer>,
    ) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.enabled {
            debug!(event_kind = ?kind, "Invalidation trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume().await;
        }
    }

    /// A post was created or edited.
    pub async fn post_upserted(&self, slug: &str, tags: &[String]) {
        self.trigger(
            EventKind::PostUpserted {
                slug: slug.to_string(),
                tags: tags.to_vec(),
            },
            true,
        )
        .await;
    }

    /// A post was soft-deleted.
    pub async fn post_deleted(&self, slug: &str, tags: &[String]) {
        self.trigger(
            EventKind::PostDeleted {
                slug: slug.to_string(),
                tags: tags.to_vec(),
            },
            true,
        )
        .await;
    }

    /// A soft-deleted post was restored.
    pub async fn post_restored(&self, slug: &str, tags: &[String]) {
        self.trigger(
            EventKind::PostRestored {
                slug: slug.to_string(),
                tags: tags.to_vec(),
            },
            true,
        )
        .await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<InvalidationConsumer> {
        &self.consumer
    }
}
