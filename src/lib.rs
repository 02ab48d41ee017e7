//! Cache Repository
//!
//! Convention-driven caching over a shared key-value store:
//! - Registered generators with read-through `get`, `regenerate` and `invalidate`
//! - Deterministic storage keys derived from a logical key and its arguments
//! - Spin-wait distributed lock with per-holder tokens
//! - Warm-up of every registered entry
//! - In-memory (moka) and Redis store backends

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use tracing::info;

use domain::{DomainError, SpinLock, StoreClient};
use infrastructure::store::StoreFactory;

/// Opens the configured store and wraps it in a [`StoreClient`]
///
/// Fails with [`DomainError::Connection`] when the backend is unreachable and with
/// [`DomainError::Configuration`] when the settings are invalid.
pub async fn connect(config: &AppConfig) -> Result<StoreClient, DomainError> {
    let expiry = config.expiry_policy()?;
    let store_config = config.store_config()?;

    let store = StoreFactory::new().create(&store_config).await?;
    info!(backend = %store_config.store_type, "Store connected");

    Ok(StoreClient::new(store).with_expiry_policy(expiry))
}

/// Builds a lock over `client` using the configured hold/wait/poll defaults
pub fn create_lock(config: &AppConfig, client: StoreClient) -> Result<SpinLock, DomainError> {
    Ok(SpinLock::new(client).with_defaults(config.lock_options()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let config = AppConfig::default();
        let client = connect(&config).await.unwrap();

        client.set("k", &1, None).await.unwrap();
        assert_eq!(client.get::<i32>("k").await.unwrap(), Some(1));
        assert_eq!(
            client.expiry_policy().default_expiry(),
            Duration::from_secs(14_400)
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_backend() {
        let mut config = AppConfig::default();
        config.store.backend = "memcached".to_string();

        let result = connect(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_create_lock_uses_configured_defaults() {
        let mut config = AppConfig::default();
        config.lock.hold_secs = 3;

        let client = connect(&config).await.unwrap();
        let lock = create_lock(&config, client).unwrap();
        assert_eq!(lock.defaults().hold, Duration::from_secs(3));
    }
}
