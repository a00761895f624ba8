//! Key/value + set store contract and implementations.
//!
//! The store is treated as reliable but not transactional: a `put` can
//! succeed while the matching `set_add` transiently fails, so consumers
//! always revalidate membership with a subsequent `get`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::info;

use crate::error::TaskResult;

/// Durable key/value store with TTLs and unordered sets.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Write a value, optionally with a time-to-live.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> TaskResult<()>;

    /// Read a value, `None` when absent or expired.
    async fn get(&self, key: &str) -> TaskResult<Option<String>>;

    /// Delete a key (absent keys are not an error).
    async fn delete(&self, key: &str) -> TaskResult<()>;

    /// Add a member to a set.
    async fn set_add(&self, set_key: &str, member: &str) -> TaskResult<()>;

    /// Remove a member from a set.
    async fn set_remove(&self, set_key: &str, member: &str) -> TaskResult<()>;

    /// All members of a set.
    async fn set_members(&self, set_key: &str) -> TaskResult<Vec<String>>;
}

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("REDIS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6379),
            db: std::env::var("REDIS_DB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            password: std::env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Connection URL for the `redis` crate.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Create a new store from configuration.
    pub fn new(config: RedisConfig) -> TaskResult<Self> {
        let client = redis::Client::open(config.url().as_str())?;
        info!("Redis store configured for {}:{}", config.host, config.port);
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> TaskResult<Self> {
        Self::new(RedisConfig::from_env())
    }

    async fn conn(&self) -> TaskResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> TaskResult<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> TaskResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> TaskResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn set_add(&self, set_key: &str, member: &str) -> TaskResult<()> {
        let mut conn = self.conn().await?;
        conn.sadd::<_, _, ()>(set_key, member).await?;
        Ok(())
    }

    async fn set_remove(&self, set_key: &str, member: &str) -> TaskResult<()> {
        let mut conn = self.conn().await?;
        conn.srem::<_, _, ()>(set_key, member).await?;
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> TaskResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.smembers(set_key).await?;
        Ok(members)
    }
}

/// In-memory store for tests and local development.
///
/// TTLs are honored on read: expired entries are dropped by `get`.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, (String, Option<Instant>)>>,
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> TaskResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> TaskResult<Option<String>> {
        let mut values = self.values.lock().unwrap();
        match values.get(key) {
            Some((_, Some(expires_at))) if *expires_at <= Instant::now() => {
                values.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> TaskResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn set_add(&self, set_key: &str, member: &str) -> TaskResult<()> {
        self.sets
            .lock()
            .unwrap()
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, set_key: &str, member: &str) -> TaskResult<()> {
        if let Some(set) = self.sets.lock().unwrap().get_mut(set_key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> TaskResult<Vec<String>> {
        Ok(self
            .sets
            .lock()
            .unwrap()
            .get(set_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
