//! In-memory store implementation using moka

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of cached values; keys taken with set-if-not-exists are not counted
    pub max_capacity: u64,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl InMemoryStoreConfig {
    /// Sets the maximum capacity
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Entry stored in moka
#[derive(Debug, Clone)]
struct StoredEntry {
    /// Serialized JSON value
    data: String,
    /// `None` for no expiry
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(now))
    }
}

/// Per-entry expiry read from the entry itself
struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        value.remaining_at(created_at)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.remaining_at(updated_at)
    }
}

/// Thread-safe in-process store
///
/// Features:
/// - Per-entry TTL, enforced by moka and reclaimed in the background
/// - Atomic set-if-not-exists and compare-and-delete via entry computation
/// - Capacity-bounded eviction for cached values only
///
/// Keys taken with set-if-not-exists (locks) live in a separate cache without a
/// capacity bound, so filling the store with values never evicts a held lock.
/// Locks taken here only exclude tasks of the same process.
#[derive(Debug)]
pub struct InMemoryStore {
    values: MokaCache<String, StoredEntry>,
    locks: MokaCache<String, StoredEntry>,
    config: InMemoryStoreConfig,
}

impl InMemoryStore {
    /// Creates a new in-memory store with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    /// Creates a new in-memory store with the given configuration
    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        let values = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();

        let locks = MokaCache::builder().expire_after(EntryExpiry).build();

        Self {
            values,
            locks,
            config,
        }
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.config
    }

    fn expiry_from_now(ttl: Duration) -> Result<Instant, DomainError> {
        Instant::now().checked_add(ttl).ok_or_else(|| {
            DomainError::store(format!("TTL of {} seconds is out of range", ttl.as_secs()))
        })
    }

    async fn live_entry(&self, key: &str) -> Option<StoredEntry> {
        let now = Instant::now();

        if let Some(entry) = self.locks.get(key).await {
            if !entry.is_expired_at(now) {
                return Some(entry);
            }
        }

        self.values
            .get(key)
            .await
            .filter(|entry| !entry.is_expired_at(now))
    }

    async fn expire_in(
        cache: &MokaCache<String, StoredEntry>,
        key: &str,
        now: Instant,
        expires_at: Instant,
    ) -> bool {
        let result = cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(existing) if !existing.value().is_expired_at(now) => Op::Put(StoredEntry {
                        data: existing.value().data.clone(),
                        expires_at: Some(expires_at),
                    }),
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        matches!(result, CompResult::ReplacedWith(_))
    }

    async fn remove_if_equals(
        cache: &MokaCache<String, StoredEntry>,
        key: &str,
        expected: &str,
        now: Instant,
    ) -> bool {
        let result = cache
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(existing)
                        if !existing.value().is_expired_at(now)
                            && existing.value().data == expected =>
                    {
                        Op::Remove
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        matches!(result, CompResult::Removed(_))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = StoredEntry {
            data: value.to_string(),
            expires_at: Some(Self::expiry_from_now(ttl)?),
        };

        self.locks.remove(key).await;
        self.values.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let now = Instant::now();
        let lock = self.locks.remove(key).await;
        let value = self.values.remove(key).await;

        Ok([lock, value]
            .into_iter()
            .flatten()
            .any(|entry| !entry.is_expired_at(now)))
    }

    async fn set_nx_raw(&self, key: &str, value: &str) -> Result<bool, DomainError> {
        let now = Instant::now();

        if self
            .values
            .get(key)
            .await
            .is_some_and(|entry| !entry.is_expired_at(now))
        {
            return Ok(false);
        }

        let entry = StoredEntry {
            data: value.to_string(),
            expires_at: None,
        };

        let result = self
            .locks
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match current {
                    Some(existing) if !existing.value().is_expired_at(now) => Op::Nop,
                    _ => Op::Put(entry),
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            DomainError::store(format!("TTL of {} seconds is out of range", ttl.as_secs()))
        })?;

        if Self::expire_in(&self.locks, key, now, expires_at).await {
            return Ok(true);
        }

        Ok(Self::expire_in(&self.values, key, now, expires_at).await)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let now = Instant::now();

        Ok(self
            .live_entry(key)
            .await
            .and_then(|entry| entry.remaining_at(now)))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, DomainError> {
        let now = Instant::now();

        if Self::remove_if_equals(&self.locks, key, expected, now).await {
            return Ok(true);
        }

        Ok(Self::remove_if_equals(&self.values, key, expected, now).await)
    }
}
