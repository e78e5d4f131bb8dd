// Cache module with fallback when Redis is not available

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Removes every key starting with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

/// Reads and decodes a JSON value. Undecodable entries count as misses.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheBackend,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "dropping undecodable cache entry");
                cache.delete(key).await?;
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn CacheBackend,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl).await
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() >= expires_at)
            .unwrap_or(false)
    }
}

/// Process-local cache used in development, tests, and as the Redis fallback
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Option<Duration>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries written without a TTL expire after `ttl`
    pub fn with_default_ttl(ttl: Option<Duration>) -> Self {
        Self {
            default_ttl: ttl,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = match self.store.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // expired: drop it after the read guard is released
        self.store.remove_if(key, |_, entry| entry.is_expired());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.store.insert(
            key.to_string(),
            CacheEntry::new(value.to_string(), ttl.or(self.default_ttl)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.store.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .store
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }
}

/// Redis-backed cache shared between API instances
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    default_ttl: Option<Duration>,
}

impl RedisCache {
    pub fn new(redis_url: &str, default_ttl: Option<Duration>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            default_ttl,
        })
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let result: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        match ttl.or(self.default_ttl) {
            Some(ttl) => {
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(ttl.as_secs().max(1))
                    .arg(value)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
            None => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async::<_, ()>(&mut conn)
                    .await?
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}*", prefix))
            .query_async(&mut conn)
            .await?;
        if !keys.is_empty() {
            redis::cmd("DEL")
                .arg(keys)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.client.get_async_connection().await?;
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(exists)
    }
}

// Cache factory
pub struct CacheFactory;

impl CacheFactory {
    /// Builds the configured backend; an unreachable Redis falls back to memory.
    pub async fn create_cache(
        config: &crate::config::CacheConfig,
        default_redis_url: &str,
    ) -> Arc<dyn CacheBackend> {
        let default_ttl = config.default_ttl();
        if config.backend.eq_ignore_ascii_case("redis") {
            let url = config.redis_url.as_deref().unwrap_or(default_redis_url);
            match RedisCache::new(url, default_ttl) {
                Ok(redis_cache) => match redis_cache.ping().await {
                    Ok(()) => {
                        info!("Using Redis cache backend");
                        return Arc::new(redis_cache);
                    }
                    Err(e) => warn!(error = %e, "Redis unreachable, falling back to in-memory cache"),
                },
                Err(e) => warn!(error = %e, "Invalid Redis URL, falling back to in-memory cache"),
            }
        }

        info!("Using in-memory cache backend");
        Arc::new(InMemoryCache::with_default_ttl(default_ttl))
    }
}
