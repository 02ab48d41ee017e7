//! Typed accessors over the JSON-valued repository

use std::future::Future;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

use super::key::KeyArg;
use super::registry::{generator_fn, Generator};
use super::repository::CacheRepository;

/// One logical key of a repository, decoded as `T`
///
/// Application repositories wrap these in one-line methods, e.g.
/// `fn latest_articles(&self) -> TypedEntry<'_, Vec<Article>>`.
pub struct TypedEntry<'a, T> {
    repository: &'a CacheRepository,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> TypedEntry<'a, T> {
    pub(crate) fn new(repository: &'a CacheRepository, key: String) -> Self {
        Self {
            repository,
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn invalidate(&self, args: &[KeyArg]) -> Result<bool, DomainError> {
        self.repository.invalidate(&self.key, args).await
    }

    pub fn storage_key(&self, args: &[KeyArg]) -> Result<String, DomainError> {
        self.repository.storage_key(&self.key, args)
    }
}

impl<T: DeserializeOwned> TypedEntry<'_, T> {
    pub async fn get(&self, args: &[KeyArg]) -> Result<T, DomainError> {
        let value = self.repository.get(&self.key, args).await?;
        self.decode(value)
    }

    pub async fn regenerate(&self, args: &[KeyArg]) -> Result<T, DomainError> {
        let value = self.repository.regenerate(&self.key, args).await?;
        self.decode(value)
    }

    fn decode(&self, value: Value) -> Result<T, DomainError> {
        serde_json::from_value(value).map_err(|e| {
            DomainError::serialization(format!(
                "Cached value of '{}' has an unexpected shape: {}",
                self.key, e
            ))
        })
    }
}

/// Wraps a generator producing any serializable `T`
pub fn typed_generator_fn<T, F, Fut>(f: F) -> impl Generator
where
    T: Serialize + Send + 'static,
    F: Fn(Vec<KeyArg>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DomainError>> + Send + 'static,
{
    generator_fn(move |args| {
        let produced = f(args);
        async move {
            let value = produced.await?;
            serde_json::to_value(value).map_err(DomainError::from)
        }
    })
}
