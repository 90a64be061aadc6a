//! Key-value store abstraction and the in-process memory backend.
//!
//! Engagement documents are JSON values addressed by string keys. The store
//! contract is deliberately small: get/set/delete with optional TTL, a
//! prefix scan for the popularity sweep, and [`update`](KeyValueStore::update)
//! — an atomic document mutation that is the store-side home of counter
//! increments, so two concurrent view bumps can never lose an update.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde_json::{Map, Value};
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("store protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Atomic mutation applied to the JSON document stored at a key.
///
/// The document is created empty when absent. Both variants are counter
/// increments; the map variant is conditional so the like cap is enforced
/// inside the same atomic step as the increment.
#[derive(Debug, Clone)]
pub enum UpdateOp {
    /// Increment the integer field `field` by 1, creating it at 0.
    IncrField { field: &'static str },
    /// Increment the integer entry `member` inside the object field `field`
    /// by 1, unless it has already reached `cap`.
    IncrMapEntry {
        field: &'static str,
        member: String,
        cap: u32,
    },
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Returns true when a key was actually removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List all live keys starting with `prefix`.
    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Atomically apply `op` to the document at `key` and return the updated
    /// document.
    async fn update(&self, key: &str, op: UpdateOp) -> Result<Value, StoreError>;
}

/// Apply an [`UpdateOp`] to a JSON document in place.
///
/// Shared by the memory backend; the REST backend runs the equivalent logic
/// server-side so the mutation stays atomic across processes.
pub(crate) fn apply_update_op(doc: &mut Value, op: &UpdateOp) {
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    let obj = doc.as_object_mut().expect("document coerced to object above");

    match op {
        UpdateOp::IncrField { field } => {
            let current = obj.get(*field).and_then(Value::as_u64).unwrap_or(0);
            obj.insert((*field).to_string(), Value::from(current.saturating_add(1)));
        }
        UpdateOp::IncrMapEntry { field, member, cap } => {
            let map = obj
                .entry((*field).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !map.is_object() {
                *map = Value::Object(Map::new());
            }
            let map = map.as_object_mut().expect("field coerced to object above");

            let current = map.get(member).and_then(Value::as_u64).unwrap_or(0);
            if current < u64::from(*cap) {
                map.insert(member.clone(), Value::from(current + 1));
            }
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process store backend: TTL-aware, LRU-bounded.
///
/// The single-node default, and the backend every test suite runs against.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = Instant::now();

        let expired = entries.get(key).is_some_and(|entry| entry.is_expired(now));
        if expired {
            entries.pop(key);
            return Ok(None);
        }

        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(rw_write(&self.entries, SOURCE, "delete").pop(key).is_some())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = rw_read(&self.entries, SOURCE, "scan");
        let now = Instant::now();

        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn update(&self, key: &str, op: UpdateOp) -> Result<Value, StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "update");
        let now = Instant::now();

        let (mut doc, expires_at) = match entries.pop(key) {
            Some(entry) if !entry.is_expired(now) => (entry.value, entry.expires_at),
            _ => (Value::Object(Map::new()), None),
        };

        apply_update_op(&mut doc, &op);

        entries.put(
            key.to_string(),
            Entry {
                value: doc.clone(),
                expires_at,
            },
        );

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(NonZeroUsize::new(16).expect("non-zero"))
    }

    #[tokio::test]
    async fn get_set_delete_roundtrip() {
        let store = store();

        assert!(store.get("post:a").await.expect("get").is_none());

        store
            .set("post:a", json!({"views": 3}), None)
            .await
            .expect("set");

        let value = store.get("post:a").await.expect("get").expect("hit");
        assert_eq!(value, json!({"views": 3}));

        assert!(store.delete("post:a").await.expect("delete"));
        assert!(store.get("post:a").await.expect("get").is_none());
        assert!(!store.delete("post:a").await.expect("delete"));
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let store = store();

        store
            .set("post:a:related", json!([1, 2]), Some(Duration::from_millis(10)))
            .await
            .expect("set");

        assert!(store.get("post:a:related").await.expect("get").is_some());

        std::thread::sleep(Duration::from_millis(25));

        assert!(store.get("post:a:related").await.expect("get").is_none());
        assert!(store.scan("post:").await.expect("scan").is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = MemoryStore::new(NonZeroUsize::new(2).expect("non-zero"));

        store.set("post:a", json!(1), None).await.expect("set");
        store.set("post:b", json!(2), None).await.expect("set");
        store.set("post:c", json!(3), None).await.expect("set");

        assert!(store.get("post:a").await.expect("get").is_none());
        assert!(store.get("post:b").await.expect("get").is_some());
        assert!(store.get("post:c").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn scan_filters_by_prefix() {
        let store = store();

        store.set("post:a", json!(1), None).await.expect("set");
        store.set("post:b", json!(2), None).await.expect("set");
        store.set("other:c", json!(3), None).await.expect("set");

        let mut keys = store.scan("post:").await.expect("scan");
        keys.sort();
        assert_eq!(keys, vec!["post:a", "post:b"]);
    }

    #[tokio::test]
    async fn update_increments_field_from_absent() {
        let store = store();

        let doc = store
            .update("post:a", UpdateOp::IncrField { field: "views" })
            .await
            .expect("update");
        assert_eq!(doc["views"], 1);

        let doc = store
            .update("post:a", UpdateOp::IncrField { field: "views" })
            .await
            .expect("update");
        assert_eq!(doc["views"], 2);
    }

    #[tokio::test]
    async fn update_caps_map_entries() {
        let store = store();
        let op = || UpdateOp::IncrMapEntry {
            field: "likes_by_user",
            member: "ab12cd34".to_string(),
            cap: 2,
        };

        store.update("post:a", op()).await.expect("update");
        store.update("post:a", op()).await.expect("update");
        let doc = store.update("post:a", op()).await.expect("update");

        assert_eq!(doc["likes_by_user"]["ab12cd34"], 2);
    }

    #[tokio::test]
    async fn update_preserves_existing_fields() {
        let store = store();

        store
            .set("post:a", json!({"slug": "a", "views": 7}), None)
            .await
            .expect("set");

        let doc = store
            .update("post:a", UpdateOp::IncrField { field: "views" })
            .await
            .expect("update");

        assert_eq!(doc["views"], 8);
        assert_eq!(doc["slug"], "a");
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let store = store();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.write().expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("post:a", json!(1), None).await.expect("set");
        assert!(store.get("post:a").await.expect("get").is_some());
    }
}
