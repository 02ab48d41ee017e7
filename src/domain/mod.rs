//! Domain layer - Cache repository, distributed lock and the store capability they share

pub mod cache;
pub mod error;
pub mod lock;
pub mod store;

pub use cache::{
    CacheDefinition, CacheOperation, CacheRepository, EnumeratedWarmup, Generator, KeyArg,
    KeyDeriver, KeyIdentity, RepositoryBuilder, TypedEntry, Warmup,
};
pub use error::DomainError;
pub use lock::{LockHandle, LockOptions, SpinLock};
pub use store::{ExpiryPolicy, KeyValueStore, KeyValueStoreExt, StoreClient};
