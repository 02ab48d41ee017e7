//! Key-value store trait definition

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Key-value store capability consumed by the lock and the cache repository
///
/// Values are opaque JSON strings so the trait stays dyn-compatible.
/// Use [`KeyValueStoreExt`] for typed get/set operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Gets a raw value, `None` when the key is absent or expired
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value with a TTL, overwriting any previous value
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Atomically sets a value without expiry if the key doesn't exist
    async fn set_nx_raw(&self, key: &str, value: &str) -> Result<bool, DomainError>;

    /// Updates the TTL of an existing key
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Gets the remaining TTL for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Deletes a key only when its current value equals `expected`
    ///
    /// The default implementation is a non-atomic read followed by a delete.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, DomainError> {
        match self.get_raw(key).await? {
            Some(current) if current == expected => self.delete(key).await,
            _ => Ok(false),
        }
    }
}

/// Extension trait providing typed get/set operations
pub trait KeyValueStoreExt: KeyValueStore {
    /// Gets a typed value from the store
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::serialization(format!(
                            "Failed to deserialize value of '{}': {}",
                            key, e
                        ))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value with a TTL
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Failed to serialize value of '{}': {}", key, e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}
