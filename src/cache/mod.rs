//! Kindred cache system.
//!
//! Engagement data lives in a key-value store behind two layers:
//!
//! - **Store backends**: an in-process memory store (TTL + LRU capacity) and
//!   a REST-protocol remote store for shared deployments.
//! - **`CacheService`**: typed get/set/delete with error containment — a
//!   store outage degrades features, it never fails a request.
//!
//! Invalidation is event-driven: write paths publish [`EventKind`] values to
//! an in-memory queue, and a consumer drains the queue and purges stale
//! related-post entries. The 24-hour TTL on those entries is the consistency
//! backstop for anything the opportunistic purge misses.

mod config;
mod consumer;
mod events;
pub mod keys;
mod lock;
mod rest;
mod service;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::InvalidationConsumer;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use rest::RestStore;
pub use service::CacheService;
pub use store::{KeyValueStore, MemoryStore, StoreError, UpdateOp};
pub use trigger::InvalidationTrigger;
