use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub mod redis;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to parse value: {0}")]
    Deserialization(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Cache trait defining the interface for all cache implementations.
///
/// This trait represents the contract that all cache backends must fulfill.
/// It provides a uniform interface for performing common cache operations
/// regardless of the underlying implementation (in-memory, Redis, etc.).
///
/// Every entry expires after the TTL the instance was created with; a `set`
/// on an existing key re-arms its TTL, which is what gives sessions their
/// rolling expiration.
///
/// Implementations of this trait should be thread-safe (Send + Sync)
/// and cloneable to support sharing across multiple handlers.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value in the cache with the instance TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T)
        -> Result<(), CacheError>;

    /// Retrieve a value from the cache
    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Retrieve a value and delete it in one step.
    ///
    /// The get and the delete are atomic with respect to concurrent `take`
    /// calls on the same key: exactly one caller observes the value, every
    /// other caller gets None. Login-state consumption relies on this.
    async fn take<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError>;

    /// Performs a deep health check on the cache backend
    ///
    /// For Redis, this will ping the server. For the in-memory cache, this
    /// will check if the cache is initialized.
    ///
    /// Returns Ok(()) if healthy, or Err with a descriptive message if unhealthy.
    async fn health_check(&self) -> Result<(), String>;

    /// Delete a value from the cache
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache implementation that provides a uniform interface regardless of backend.
///
/// This enum serves as a type-safe wrapper around different cache implementations.
/// The concrete implementation is chosen at runtime based on the application
/// configuration: Moka for single-node development, Redis when sessions have
/// to survive restarts or be shared between instances.
#[derive(Clone)]
pub enum Cache {
    /// In-memory cache implementation using Moka
    InMemory(memory::InMemoryCache),
    /// Redis-based cache implementation
    Redis(redis::RedisCache),
}

#[async_trait::async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.set(key, value).await,
            Self::Redis(cache) => cache.set(key, value).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    async fn take<T: DeserializeOwned + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        match self {
            Self::InMemory(cache) => cache.take(key).await,
            Self::Redis(cache) => cache.take(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match self {
            Self::InMemory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::InMemory(cache) => cache.delete(key).await,
            Self::Redis(cache) => cache.delete(key).await,
        }
    }
}

/// Factory function to create a cache instance based on configuration.
///
/// The server creates two instances from the same configuration: one holding
/// login states and one holding sessions, each with its own TTL. Only the
/// expiry differs; both land in the same Redis database when Redis is
/// configured.
pub async fn create_cache(
    config: &crate::config::CacheConfig,
    ttl_secs: u64,
) -> Result<Cache, CacheError> {
    match config.store {
        crate::config::CacheStore::InMemory => {
            let cache = memory::InMemoryCache::new(ttl_secs, config.memory.capacity)
                .map_err(CacheError::Config)?;
            Ok(Cache::InMemory(cache))
        }
        crate::config::CacheStore::Redis => {
            if config.redis.url.is_empty() {
                return Err(CacheError::Config(
                    "Redis URL is required for Redis cache".to_string(),
                ));
            }
            let cache = redis::RedisCache::new(&config.redis.url, ttl_secs)
                .await
                .map_err(CacheError::Config)?;
            Ok(Cache::Redis(cache))
        }
    }
}
