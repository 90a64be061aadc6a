//! Typed cache access with error containment.
//!
//! The cache is an optimization, never a source of truth: any store failure
//! (transport, protocol, serialization) is logged, counted, and converted to
//! a miss or a dropped write. Callers see `Option`s, not errors, so a cache
//! outage degrades the feature instead of failing the request.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::store::{KeyValueStore, UpdateOp};

pub struct CacheService {
    store: Arc<dyn KeyValueStore>,
}

impl CacheService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(decoded) => {
                    counter!("kindred_cache_hit_total").increment(1);
                    Some(decoded)
                }
                Err(err) => {
                    counter!("kindred_cache_error_total").increment(1);
                    warn!(key, error = %err, "cached document failed to decode; treating as miss");
                    None
                }
            },
            Ok(None) => {
                counter!("kindred_cache_miss_total").increment(1);
                None
            }
            Err(err) => {
                counter!("kindred_cache_error_total").increment(1);
                warn!(key, error = %err, "cache read failed; treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                counter!("kindred_cache_error_total").increment(1);
                warn!(key, error = %err, "value failed to encode; dropping cache write");
                return;
            }
        };

        if let Err(err) = self.store.set(key, encoded, ttl).await {
            counter!("kindred_cache_error_total").increment(1);
            warn!(key, error = %err, "cache write failed; dropping");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            counter!("kindred_cache_error_total").increment(1);
            warn!(key, error = %err, "cache delete failed; relying on TTL");
        }
    }

    /// List live keys under `prefix`; empty on store failure.
    pub async fn scan(&self, prefix: &str) -> Vec<String> {
        match self.store.scan(prefix).await {
            Ok(keys) => keys,
            Err(err) => {
                counter!("kindred_cache_error_total").increment(1);
                warn!(prefix, error = %err, "cache scan failed; returning empty set");
                Vec::new()
            }
        }
    }

    /// Atomically mutate the document at `key`; `None` on store failure.
    pub async fn update(&self, key: &str, op: UpdateOp) -> Option<Value> {
        match self.store.update(key, op).await {
            Ok(doc) => Some(doc),
            Err(err) => {
                counter!("kindred_cache_error_total").increment(1);
                warn!(key, error = %err, "cache update failed; dropping increment");
                None
            }
        }
    }
}
