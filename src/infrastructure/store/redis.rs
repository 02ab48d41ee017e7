//! Redis store implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, IntoConnectionInfo, Script};

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Deletes KEYS[1] only while it still holds ARGV[1]
const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Configuration for Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Database index to select, overriding the one in the URL
    pub database: Option<i64>,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            database: None,
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisStoreConfig {
    /// Creates a new configuration with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Selects a database index
    pub fn with_database(mut self, database: i64) -> Self {
        self.database = Some(database);
        self
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis store implementation
///
/// Features:
/// - Millisecond TTLs (PSETEX, PEXPIRE, PTTL)
/// - Atomic SETNX and Lua compare-and-delete
/// - Reconnecting connection via ConnectionManager
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Opens the connection, failing with [`DomainError::Connection`] when Redis is unreachable
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let mut info = config.url.as_str().into_connection_info().map_err(|e| {
            DomainError::configuration(format!("Invalid Redis URL '{}': {}", config.url, e))
        })?;

        if let Some(database) = config.database {
            if database < 0 {
                return Err(DomainError::configuration(format!(
                    "Can't select redis database #{}",
                    database
                )));
            }
            info.redis.db = database;
        }

        let client = Client::open(info)
            .map_err(|e| DomainError::connection(&config.url, e.to_string()))?;

        let connection =
            tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    DomainError::connection(
                        &config.url,
                        format!(
                            "timed out after {} seconds",
                            config.connection_timeout.as_secs()
                        ),
                    )
                })?
                .map_err(|e| DomainError::connection(&config.url, e.to_string()))?;

        Ok(Self { connection, config })
    }

    /// Creates a Redis store with default configuration
    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Milliseconds for PSETEX/PEXPIRE, which take a signed 64-bit value
    fn millis(ttl: Duration) -> Result<i64, DomainError> {
        i64::try_from(ttl.as_millis())
            .map(|millis| millis.max(1))
            .map_err(|_| {
                DomainError::store(format!("TTL of {} seconds is out of range", ttl.as_secs()))
            })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(&prefixed_key)
            .await
            .map_err(|e| DomainError::store(format!("Failed to get key '{}': {}", key, e)))?;

        Ok(result)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let millis = Self::millis(ttl)?;
        let mut conn = self.connection.clone();

        let _: () = conn
            .pset_ex(&prefixed_key, value, millis as u64)
            .await
            .map_err(|e| DomainError::store(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(&prefixed_key)
            .await
            .map_err(|e| DomainError::store(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn set_nx_raw(&self, key: &str, value: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let set: bool = conn
            .set_nx(&prefixed_key, value)
            .await
            .map_err(|e| DomainError::store(format!("Failed to set_nx key '{}': {}", key, e)))?;

        Ok(set)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let millis = Self::millis(ttl)?;
        let mut conn = self.connection.clone();

        let updated: bool = conn
            .pexpire(&prefixed_key, millis)
            .await
            .map_err(|e| {
                DomainError::store(format!("Failed to update TTL for key '{}': {}", key, e))
            })?;

        Ok(updated)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_millis: i64 = conn.pttl(&prefixed_key).await.map_err(|e| {
            DomainError::store(format!("Failed to get TTL for key '{}': {}", key, e))
        })?;

        // Redis returns -2 if key doesn't exist, -1 if no TTL
        if ttl_millis < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(ttl_millis as u64)))
        }
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = Script::new(COMPARE_AND_DELETE)
            .key(&prefixed_key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::store(format!("Failed to compare-and-delete key '{}': {}", key, e))
            })?;

        Ok(deleted > 0)
    }
}
