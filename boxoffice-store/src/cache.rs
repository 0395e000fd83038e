use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use std::time::Duration;
use tracing::{debug, warn};

use boxoffice_domain::cache::EventCache;

/// Redis-backed read-model cache. Entries live under `{cache}::{key}` with
/// a shared TTL; eviction scans a cache's prefix and deletes every entry.
///
/// All failures are swallowed after logging: a read falls through to the
/// store, a write is simply not cached, an eviction is covered by the TTL.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    ttl: Duration,
}

impl RedisCache {
    pub fn new(connection_string: &str, ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl })
    }

    fn entry_key(cache: &str, key: &str) -> String {
        format!("{}::{}", cache, key)
    }

    async fn try_get(&self, cache: &str, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(Self::entry_key(cache, key)).await
    }

    async fn try_put(&self, cache: &str, key: &str, value: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex(Self::entry_key(cache, key), value, self.ttl.as_secs())
            .await
    }

    async fn try_evict(&self, cache: &str) -> RedisResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut scan_conn = conn.clone();

        let pattern = format!("{}::*", cache);
        let mut keys = Vec::new();
        {
            let mut iter = scan_conn.scan_match::<_, String>(&pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let evicted = keys.len();
        conn.del::<_, ()>(keys).await?;
        Ok(evicted)
    }
}

#[async_trait]
impl EventCache for RedisCache {
    async fn get(&self, cache: &str, key: &str) -> Option<String> {
        match self.try_get(cache, key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache read failed for {}::{}: {}", cache, key, e);
                None
            }
        }
    }

    async fn put(&self, cache: &str, key: &str, value: &str) {
        if let Err(e) = self.try_put(cache, key, value).await {
            warn!("Cache write failed for {}::{}: {}", cache, key, e);
        }
    }

    async fn evict(&self, caches: &[&str]) {
        for cache in caches {
            match self.try_evict(cache).await {
                Ok(count) if count > 0 => debug!("Evicted {} entries from '{}'", count, cache),
                Ok(_) => {}
                Err(e) => warn!("Cache eviction failed for '{}': {}", cache, e),
            }
        }
    }
}
