//! Key-value store configuration

use confique::Config;
use serde::Deserialize;

/// Specifies which key-value store implementation to use
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStore {
    #[default]
    InMemory,
    Redis,
}

/// Configuration for the key-value store holding sessions and login state
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Store type: "in-memory" (default) or "redis"
    #[config(env = "ROLLCALL_CACHE_STORE", default = "in-memory")]
    pub store: CacheStore,

    /// In-memory store specific configuration
    #[config(nested)]
    pub memory: InMemoryConfig,

    /// Redis store specific configuration
    #[config(nested)]
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: CacheStore::InMemory,
            memory: InMemoryConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

/// In-memory store configuration options
#[derive(Debug, Config, Clone)]
pub struct InMemoryConfig {
    /// Maximum capacity in MiB (default: 128 MiB)
    #[config(env = "ROLLCALL_CACHE_MEMORY_CAPACITY", default = 128)]
    pub capacity: usize,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self { capacity: 128 }
    }
}

/// Redis store configuration options
#[derive(Debug, Config, Clone, Default)]
pub struct RedisConfig {
    /// Redis connection string
    #[config(env = "ROLLCALL_CACHE_REDIS_URL", default = "")]
    pub url: String,
}
