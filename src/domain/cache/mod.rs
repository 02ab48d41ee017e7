//! Cache domain - Registration table, key derivation and the cache repository

mod key;
mod operation;
mod registry;
mod repository;
mod typed;

pub use key::{KeyArg, KeyDeriver, KeyIdentity, DEFAULT_PREFIX};
pub use operation::CacheOperation;
pub use registry::{
    generator_fn, CacheDefinition, EnumeratedWarmup, FnGenerator, Generator, RepositoryBuilder,
    Warmup,
};
pub use repository::CacheRepository;
pub use typed::{typed_generator_fn, TypedEntry};
