//! Registration table: logical key -> generator, arity and warm-up

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;

use crate::domain::store::StoreClient;
use crate::domain::DomainError;

use super::key::{KeyArg, KeyDeriver};
use super::repository::CacheRepository;

/// Computes the value cached under one logical key
///
/// Returning `Err` is the failure signal; it is never confused with a cache miss.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, args: &[KeyArg]) -> Result<Value, DomainError>;
}

/// Enumerates the argument space of a parameterized key and regenerates each entry
#[async_trait]
pub trait Warmup: Send + Sync {
    async fn warmup(&self, repository: &CacheRepository, key: &str) -> Result<(), DomainError>;
}

/// Adapts an async closure into a [`Generator`]
pub struct FnGenerator<F> {
    f: F,
}

/// Wraps `f(args)` as a generator
pub fn generator_fn<F, Fut>(f: F) -> FnGenerator<F>
where
    F: Fn(Vec<KeyArg>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, DomainError>> + Send,
{
    FnGenerator { f }
}

#[async_trait]
impl<F, Fut> Generator for FnGenerator<F>
where
    F: Fn(Vec<KeyArg>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, DomainError>> + Send,
{
    async fn generate(&self, args: &[KeyArg]) -> Result<Value, DomainError> {
        (self.f)(args.to_vec()).await
    }
}

/// Warm-up that regenerates every argument set returned by `enumerate`
pub struct EnumeratedWarmup<F> {
    enumerate: F,
}

impl<F, Fut> EnumeratedWarmup<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Vec<KeyArg>>, DomainError>> + Send,
{
    pub fn new(enumerate: F) -> Self {
        Self { enumerate }
    }
}

#[async_trait]
impl<F, Fut> Warmup for EnumeratedWarmup<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Vec<KeyArg>>, DomainError>> + Send,
{
    async fn warmup(&self, repository: &CacheRepository, key: &str) -> Result<(), DomainError> {
        let argument_sets = (self.enumerate)().await?;

        try_join_all(
            argument_sets
                .iter()
                .map(|args| repository.regenerate(key, args)),
        )
        .await?;

        Ok(())
    }
}

/// One row of the registration table
#[derive(Clone)]
pub struct CacheDefinition {
    name: String,
    arity: usize,
    generator: Arc<dyn Generator>,
    warmup: Option<Arc<dyn Warmup>>,
}

impl fmt::Debug for CacheDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDefinition")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("warmup", &self.warmup.is_some())
            .finish()
    }
}

impl CacheDefinition {
    /// `arity` is the number of arguments the generator requires
    pub fn new(name: impl Into<String>, arity: usize, generator: impl Generator + 'static) -> Self {
        Self {
            name: name.into(),
            arity,
            generator: Arc::new(generator),
            warmup: None,
        }
    }

    pub fn with_warmup(mut self, warmup: impl Warmup + 'static) -> Self {
        self.warmup = Some(Arc::new(warmup));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn has_warmup(&self) -> bool {
        self.warmup.is_some()
    }

    /// Name of the warm-up function expected for this key
    pub fn warmup_name(&self) -> String {
        format!("warmup{}", self.name)
    }

    pub(crate) fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub(crate) fn warmup(&self) -> Option<&dyn Warmup> {
        self.warmup.as_deref()
    }
}

/// Builds a [`CacheRepository`] from a set of definitions
#[derive(Debug)]
pub struct RepositoryBuilder {
    client: StoreClient,
    deriver: KeyDeriver,
    definitions: Vec<CacheDefinition>,
}

impl RepositoryBuilder {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            deriver: KeyDeriver::default(),
            definitions: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.deriver = KeyDeriver::new(prefix);
        self
    }

    pub fn register(mut self, definition: CacheDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Shorthand for registering a closure generator
    pub fn register_fn<F, Fut>(self, name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(Vec<KeyArg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, DomainError>> + Send + 'static,
    {
        self.register(CacheDefinition::new(name, arity, generator_fn(f)))
    }

    /// Validates names and uniqueness, then freezes the table
    pub fn build(self) -> Result<CacheRepository, DomainError> {
        if self.deriver.prefix().is_empty() {
            return Err(DomainError::configuration("Repository prefix must not be empty"));
        }

        let mut index = HashMap::with_capacity(self.definitions.len());

        for (position, definition) in self.definitions.iter().enumerate() {
            validate_name(definition.name())?;

            if index.insert(definition.name().to_string(), position).is_some() {
                return Err(DomainError::configuration(format!(
                    "Cache key '{}' is registered more than once",
                    definition.name()
                )));
            }
        }

        Ok(CacheRepository::from_parts(
            self.client,
            self.deriver,
            self.definitions,
            index,
        ))
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid cache key name '{}': use letters, digits and underscores only",
            name
        )))
    }
}
