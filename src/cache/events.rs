//! Cache event system.
//!
//! Post mutations publish events; the invalidation consumer drains them and
//! purges stale related-post cache entries.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Hard ceiling on queued events; beyond it new events are dropped and the
/// entry TTL becomes the only consistency mechanism.
const MAX_QUEUE_LEN: usize = 1024;

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Cache event with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    /// Monotonic epoch for ordering within this process.
    pub epoch: Epoch,
    /// The mutation that occurred.
    pub kind: EventKind,
    /// When the event was created.
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Post mutations that trigger invalidation.
///
/// Each variant carries the tag set that defines the post's overlap
/// neighborhood, so the consumer can purge affected related-post entries
/// without re-reading the (possibly already deleted) row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A post was created or edited. For edits, `tags` is the union of the
    /// old and new tag sets so posts that only overlapped the previous set
    /// are purged too.
    PostUpserted { slug: String, tags: Vec<String> },
    /// A post was soft-deleted.
    PostDeleted { slug: String, tags: Vec<String> },
    /// A soft-deleted post was restored.
    PostRestored { slug: String, tags: Vec<String> },
}

impl EventKind {
    pub fn slug(&self) -> &str {
        match self {
            EventKind::PostUpserted { slug, .. }
            | EventKind::PostDeleted { slug, .. }
            | EventKind::PostRestored { slug, .. } => slug,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            EventKind::PostUpserted { tags, .. }
            | EventKind::PostDeleted { tags, .. }
            | EventKind::PostRestored { tags, .. } => tags,
        }
    }
}

/// In-memory FIFO event queue.
///
/// A mutex is sufficient: events come from the admin write path, where
/// contention is negligible.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event to the queue; drops (with a metric) when full.
    pub fn publish(&self, kind: EventKind) {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind.clone(), epoch);

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        if queue.len() >= MAX_QUEUE_LEN {
            counter!("kindred_engagement_event_dropped_total").increment(1);
            warn!(
                event_kind = ?kind,
                queue_len = queue.len(),
                "Event queue full; dropping cache event (TTL will reconcile)"
            );
            return;
        }

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?kind,
            "Cache event enqueued"
        );

        queue.push_back(event);
        gauge!("kindred_engagement_event_queue_len").set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let events: Vec<CacheEvent> = queue.drain(..count).collect();
        gauge!("kindred_engagement_event_queue_len").set(queue.len() as f64);
        events
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
