//! Redis-backed counter store for multi-node deployments.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use crate::security::counter::{CounterError, CounterStore, WindowCount};

// INCR and the first PEXPIRE run in one script so a crash between them can
// never leave a counter without a TTL.
const INCR_WITH_TTL: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Counter store sharing windows through Redis.
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl RedisCounterStore {
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self, CounterError> {
        tracing::info!(url = %mask_redis_url(url), "Connecting counter store to Redis");
        let client = Client::open(url).map_err(|e| CounterError::Unavailable(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CounterError::Unavailable(e.to_string()))?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.to_string(),
            script: Script::new(INCR_WITH_TTL),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CounterError> {
        let full_key = format!("{}{}", self.key_prefix, key);
        let mut conn = self.conn.clone();
        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(&full_key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CounterError::Unavailable(e.to_string()))?;

        if count < 1 {
            return Err(CounterError::Protocol(format!("non-positive count {count} for {full_key}")));
        }
        Ok(WindowCount {
            count: count as u64,
            remaining: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }
}

/// Mask the password in a Redis URL for logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
