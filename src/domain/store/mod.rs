//! Store domain - Key-value store capability and the client handle around it

mod client;
mod repository;

pub use client::{ExpiryPolicy, StoreClient, DEFAULT_EXPIRE, MAX_EXPIRE};
pub use repository::{KeyValueStore, KeyValueStoreExt};

#[cfg(test)]
pub use repository::MockKeyValueStore;
