//! Cache repository: fetch-or-compute, regenerate, invalidate and warm-up

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::lock::{LockOptions, SpinLock};
use crate::domain::store::StoreClient;
use crate::domain::DomainError;

use super::key::{KeyArg, KeyDeriver};
use super::operation::CacheOperation;
use super::registry::{CacheDefinition, RepositoryBuilder};
use super::typed::TypedEntry;

/// Envelope around every cached value
///
/// Keeps `false`, `null`, `0` and `""` cacheable: only the store's "not found"
/// means a miss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CachedValue {
    value: Value,
}

struct RepositoryInner {
    client: StoreClient,
    deriver: KeyDeriver,
    definitions: Vec<CacheDefinition>,
    index: HashMap<String, usize>,
}

/// Maps logical keys to their generators and manages the cached values
///
/// Built once through [`CacheRepository::builder`]; cloning shares the table.
/// Concurrent misses on the same key each run the generator; use
/// [`CacheRepository::get_locked`] to serialize them.
#[derive(Clone)]
pub struct CacheRepository {
    inner: Arc<RepositoryInner>,
}

impl fmt::Debug for CacheRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRepository")
            .field("prefix", &self.inner.deriver.prefix())
            .field("definitions", &self.inner.definitions)
            .finish()
    }
}

impl CacheRepository {
    pub fn builder(client: StoreClient) -> RepositoryBuilder {
        RepositoryBuilder::new(client)
    }

    pub(crate) fn from_parts(
        client: StoreClient,
        deriver: KeyDeriver,
        definitions: Vec<CacheDefinition>,
        index: HashMap<String, usize>,
    ) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                client,
                deriver,
                definitions,
                index,
            }),
        }
    }

    pub fn client(&self) -> &StoreClient {
        &self.inner.client
    }

    pub fn prefix(&self) -> &str {
        self.inner.deriver.prefix()
    }

    /// Registered logical keys, in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.definitions.iter().map(|d| d.name())
    }

    /// Looks up the definition of `key`
    pub fn definition(&self, key: &str) -> Result<&CacheDefinition, DomainError> {
        self.inner
            .index
            .get(key)
            .map(|&position| &self.inner.definitions[position])
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "No generator registered for cache key '{}'. Check the key name for typos",
                    key
                ))
            })
    }

    /// Derives the storage key of a registered logical key
    pub fn storage_key(&self, key: &str, args: &[KeyArg]) -> Result<String, DomainError> {
        let definition = self.definition(key)?;
        Ok(self.inner.deriver.derive(definition.name(), args))
    }

    /// Typed accessor for one logical key
    pub fn entry<T>(&self, key: impl Into<String>) -> TypedEntry<'_, T> {
        TypedEntry::new(self, key.into())
    }

    /// Returns the cached value, computing and storing it with the default expiry on a miss
    pub async fn get(&self, key: &str, args: &[KeyArg]) -> Result<Value, DomainError> {
        self.get_with_expiry(key, args, None).await
    }

    /// Like [`CacheRepository::get`], storing a miss with `ttl` instead of the default expiry
    pub async fn get_with_expiry(
        &self,
        key: &str,
        args: &[KeyArg],
        ttl: Option<Duration>,
    ) -> Result<Value, DomainError> {
        let definition = self.definition(key)?;
        let storage_key = self.inner.deriver.derive(definition.name(), args);

        let cached: CachedValue = self
            .inner
            .client
            .get_stored(
                &storage_key,
                || async {
                    let value = self.generate(definition, args).await?;
                    info!(key = %definition.name(), storage_key = %storage_key, "Cache entry computed on miss");
                    Ok::<_, DomainError>(CachedValue { value })
                },
                ttl,
            )
            .await?;

        Ok(cached.value)
    }

    /// Runs the generator unconditionally and overwrites the cached value
    ///
    /// A failing generator leaves the previous value in place.
    pub async fn regenerate(&self, key: &str, args: &[KeyArg]) -> Result<Value, DomainError> {
        let definition = self.definition(key)?;
        let storage_key = self.inner.deriver.derive(definition.name(), args);

        self.store_generated(definition, &storage_key, args).await
    }

    /// Deletes the cached value, returning whether one existed
    pub async fn invalidate(&self, key: &str, args: &[KeyArg]) -> Result<bool, DomainError> {
        let definition = self.definition(key)?;
        let storage_key = self.inner.deriver.derive(definition.name(), args);

        let deleted = self.inner.client.delete(&storage_key).await?;
        info!(key = %definition.name(), storage_key = %storage_key, deleted, "Cache entry invalidated");

        Ok(deleted)
    }

    /// Runs `operation` on `key`; `Invalidate` yields `None`
    pub async fn dispatch(
        &self,
        operation: CacheOperation,
        key: &str,
        args: &[KeyArg],
    ) -> Result<Option<Value>, DomainError> {
        match operation {
            CacheOperation::Get => self.get(key, args).await.map(Some),
            CacheOperation::Regenerate => self.regenerate(key, args).await.map(Some),
            CacheOperation::Invalidate => self.invalidate(key, args).await.map(|_| None),
        }
    }

    /// Fills every registered key
    ///
    /// Keys with a warm-up function delegate to it, zero-argument keys are
    /// regenerated directly. A parameterized key without a warm-up function is a
    /// configuration error, reported before anything is written.
    pub async fn warmup(&self) -> Result<(), DomainError> {
        if let Some(definition) = self
            .inner
            .definitions
            .iter()
            .find(|d| !d.has_warmup() && d.arity() > 0)
        {
            return Err(DomainError::configuration(format!(
                "Cache key '{}' depends on {} required argument(s), but there is no warm-up \
                 function '{}' to generate values for every possible argument",
                definition.name(),
                definition.arity(),
                definition.warmup_name()
            )));
        }

        for definition in &self.inner.definitions {
            match definition.warmup() {
                Some(warmup) => {
                    info!(key = %definition.name(), "Running warm-up function");
                    warmup.warmup(self, definition.name()).await?;
                }
                None => {
                    self.regenerate(definition.name(), &[]).await?;
                }
            }
        }

        info!(keys = self.inner.definitions.len(), "Cache warm-up complete");
        Ok(())
    }

    /// Fetch-or-compute with the computation serialized by `lock`
    ///
    /// On a miss the lock `lock:<storage key>` is taken and the cache checked again,
    /// so concurrent callers run the generator once.
    pub async fn get_locked(
        &self,
        lock: &SpinLock,
        key: &str,
        args: &[KeyArg],
        options: LockOptions,
    ) -> Result<Value, DomainError> {
        let definition = self.definition(key)?;
        let storage_key = self.inner.deriver.derive(definition.name(), args);

        if let Some(cached) = self.inner.client.get::<CachedValue>(&storage_key).await? {
            return Ok(cached.value);
        }

        let lock_key = format!("lock:{}", storage_key);
        lock.with_lock(&lock_key, options, || async {
            if let Some(cached) = self.inner.client.get::<CachedValue>(&storage_key).await? {
                debug!(storage_key = %storage_key, "Entry filled while waiting for the lock");
                return Ok(cached.value);
            }

            self.store_generated(definition, &storage_key, args).await
        })
        .await
    }

    async fn store_generated(
        &self,
        definition: &CacheDefinition,
        storage_key: &str,
        args: &[KeyArg],
    ) -> Result<Value, DomainError> {
        let ttl = self.inner.client.expiry_policy().resolve(None)?;
        let value = self.generate(definition, args).await?;
        let cached = CachedValue { value };

        self.inner.client.set(storage_key, &cached, Some(ttl)).await?;
        info!(key = %definition.name(), storage_key = %storage_key, "Cache entry regenerated");

        Ok(cached.value)
    }

    async fn generate(
        &self,
        definition: &CacheDefinition,
        args: &[KeyArg],
    ) -> Result<Value, DomainError> {
        if args.len() < definition.arity() {
            return Err(DomainError::configuration(format!(
                "Cache key '{}' requires {} argument(s), got {}",
                definition.name(),
                definition.arity(),
                args.len()
            )));
        }

        definition
            .generator()
            .generate(args)
            .await
            .map_err(|e| match e {
                DomainError::Generation { .. } => e,
                other => DomainError::generation(
                    definition.name(),
                    format!("generator failed or returned an invalid result: {}", other),
                ),
            })
    }
}
