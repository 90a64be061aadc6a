//! REST-protocol store backend.
//!
//! Speaks the Redis-over-HTTPS command protocol used by hosted key-value
//! services: each request POSTs a command array to the endpoint root and
//! receives `{"result": ...}` or `{"error": "..."}`. Documents are stored as
//! JSON strings; the atomic [`UpdateOp`] variants run server-side as Lua so
//! concurrent increments from multiple processes cannot lose updates.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::store::{KeyValueStore, StoreError, UpdateOp};

const SCAN_PAGE_SIZE: &str = "100";

const INCR_FIELD_SCRIPT: &str = r#"
local doc = redis.call('GET', KEYS[1])
local obj
if doc then obj = cjson.decode(doc) else obj = {} end
obj[ARGV[1]] = (tonumber(obj[ARGV[1]]) or 0) + 1
local out = cjson.encode(obj)
redis.call('SET', KEYS[1], out)
return out
"#;

const INCR_MAP_ENTRY_SCRIPT: &str = r#"
local doc = redis.call('GET', KEYS[1])
local obj
if doc then obj = cjson.decode(doc) else obj = {} end
local map = obj[ARGV[1]]
if type(map) ~= 'table' then map = {} end
local current = tonumber(map[ARGV[2]]) or 0
if current < tonumber(ARGV[3]) then
    map[ARGV[2]] = current + 1
end
obj[ARGV[1]] = map
local out = cjson.encode(obj)
redis.call('SET', KEYS[1], out)
return out
"#;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Remote store client for shared multi-process deployments.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, parts: Vec<Value>) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&parts)
            .send()
            .await
            .map_err(|err| StoreError::transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::transport(format!(
                "command endpoint returned {status}"
            )));
        }

        let body: CommandResponse = response
            .json()
            .await
            .map_err(|err| StoreError::transport(err.to_string()))?;

        if let Some(error) = body.error {
            return Err(StoreError::protocol(error));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }

    /// Parse a command result that carries a JSON document as a string.
    fn parse_document(result: Value) -> Result<Option<Value>, StoreError> {
        match result {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            other => Err(StoreError::protocol(format!(
                "expected string document, got {other}"
            ))),
        }
    }
}

#[async_trait]
impl KeyValueStore for RestStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let result = self
            .command(vec![Value::from("GET"), Value::from(key)])
            .await?;
        Self::parse_document(result)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&value)?;
        let mut parts = vec![Value::from("SET"), Value::from(key), Value::from(encoded)];
        if let Some(ttl) = ttl {
            parts.push(Value::from("EX"));
            parts.push(Value::from(ttl.as_secs().max(1).to_string()));
        }
        self.command(parts).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = self
            .command(vec![Value::from("DEL"), Value::from(key)])
            .await?;
        Ok(result.as_u64().unwrap_or(0) > 0)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{prefix}*");
        let mut cursor = "0".to_string();
        let mut keys = Vec::new();

        loop {
            let result = self
                .command(vec![
                    Value::from("SCAN"),
                    Value::from(cursor.clone()),
                    Value::from("MATCH"),
                    Value::from(pattern.clone()),
                    Value::from("COUNT"),
                    Value::from(SCAN_PAGE_SIZE),
                ])
                .await?;

            let page = result
                .as_array()
                .ok_or_else(|| StoreError::protocol("SCAN result is not an array"))?;
            let next_cursor = page
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::protocol("SCAN cursor missing"))?
                .to_string();
            let batch = page
                .get(1)
                .and_then(Value::as_array)
                .ok_or_else(|| StoreError::protocol("SCAN key batch missing"))?;

            keys.extend(
                batch
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string),
            );

            if next_cursor == "0" {
                return Ok(keys);
            }
            cursor = next_cursor;
        }
    }

    async fn update(&self, key: &str, op: UpdateOp) -> Result<Value, StoreError> {
        let parts = match op {
            UpdateOp::IncrField { field } => vec![
                Value::from("EVAL"),
                Value::from(INCR_FIELD_SCRIPT),
                Value::from("1"),
                Value::from(key),
                Value::from(field),
            ],
            UpdateOp::IncrMapEntry { field, member, cap } => vec![
                Value::from("EVAL"),
                Value::from(INCR_MAP_ENTRY_SCRIPT),
                Value::from("1"),
                Value::from(key),
                Value::from(field),
                Value::from(member),
                Value::from(cap.to_string()),
            ],
        };

        let result = self.command(parts).await?;
        Self::parse_document(result)?
            .ok_or_else(|| StoreError::protocol("EVAL returned no document"))
    }
}
