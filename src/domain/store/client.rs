//! Store client handle shared by the lock and the cache repository

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::domain::DomainError;

use super::repository::{KeyValueStore, KeyValueStoreExt};

/// Default expiry for stored values (4 hours)
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(14_400);

/// Maximum expiry a caller may request (31 days)
pub const MAX_EXPIRE: Duration = Duration::from_secs(2_678_400);

/// Default and maximum expiry applied to every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    default_expiry: Duration,
    max_expiry: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            default_expiry: DEFAULT_EXPIRE,
            max_expiry: MAX_EXPIRE,
        }
    }
}

impl ExpiryPolicy {
    /// Creates a policy, rejecting a zero or over-the-limit default
    pub fn new(default_expiry: Duration, max_expiry: Duration) -> Result<Self, DomainError> {
        if default_expiry.is_zero() {
            return Err(DomainError::configuration("Default expiry must be positive"));
        }

        if default_expiry > max_expiry {
            return Err(DomainError::configuration(format!(
                "Default expiry of {} seconds exceeds the maximum of {} seconds",
                default_expiry.as_secs(),
                max_expiry.as_secs()
            )));
        }

        Ok(Self {
            default_expiry,
            max_expiry,
        })
    }

    pub fn default_expiry(&self) -> Duration {
        self.default_expiry
    }

    pub fn max_expiry(&self) -> Duration {
        self.max_expiry
    }

    /// Resolves an optional TTL to the effective one, enforcing the maximum
    pub fn resolve(&self, ttl: Option<Duration>) -> Result<Duration, DomainError> {
        let ttl = ttl.unwrap_or(self.default_expiry);

        if ttl > self.max_expiry {
            return Err(DomainError::expiry_too_large(ttl, self.max_expiry));
        }

        if ttl.is_zero() {
            return Err(DomainError::configuration("Expiry must be positive"));
        }

        Ok(ttl)
    }
}

/// Explicit handle around a key-value store
///
/// Owns the expiry policy so that no write can exceed the configured maximum.
/// Cloning is cheap; all clones share the same underlying store.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn KeyValueStore>,
    expiry: ExpiryPolicy,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("store", &"<KeyValueStore>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl StoreClient {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            expiry: ExpiryPolicy::default(),
        }
    }

    pub fn with_expiry_policy(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Gets a typed value
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned + Send,
    {
        self.store.get(key).await
    }

    /// Stores a typed value, using the default expiry when `ttl` is `None`
    ///
    /// Fails with [`DomainError::ExpiryTooLarge`] before touching the store
    /// when `ttl` exceeds the maximum.
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<(), DomainError>
    where
        V: Serialize + Send + Sync,
    {
        let ttl = self.expiry.resolve(ttl)?;
        self.store.set(key, value, ttl).await
    }

    /// Deletes a key, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        self.store.delete(key).await
    }

    /// Returns the stored value or computes, stores and returns a new one
    ///
    /// Nothing is written when `compute` fails.
    pub async fn get_stored<V, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
    ) -> Result<V, DomainError>
    where
        V: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>>,
    {
        let ttl = self.expiry.resolve(ttl)?;

        if let Some(value) = self.store.get(key).await? {
            debug!(key = %key, "Store hit");
            return Ok(value);
        }

        debug!(key = %key, "Store miss, computing value");
        let value = compute().await?;
        self.store.set(key, &value, ttl).await?;

        Ok(value)
    }
}
