//! Per-request memoization.
//!
//! A `RequestMemo` is created by middleware for each incoming request and
//! dropped with it. Services use it to deduplicate identical lookups within
//! one request lifecycle — N renders of the same page issue one computation
//! — without touching the cross-request TTL cache.

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    op: &'static str,
    arg: String,
}

#[derive(Debug, Default)]
pub struct RequestMemo {
    entries: DashMap<MemoKey, Value>,
}

impl RequestMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, op: &'static str, arg: &str) -> Option<T> {
        let key = MemoKey {
            op,
            arg: arg.to_string(),
        };
        let value = self.entries.get(&key)?.value().clone();
        serde_json::from_value(value).ok()
    }

    pub fn put<T: Serialize>(&self, op: &'static str, arg: &str, value: &T) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(op, arg, error = %err, "memo value failed to encode; skipping");
                return;
            }
        };
        self.entries.insert(
            MemoKey {
                op,
                arg: arg.to_string(),
            },
            encoded,
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
