use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::DEFAULT_PREFIX;
use crate::domain::lock::{LockOptions, DEFAULT_HOLD, DEFAULT_POLL, DEFAULT_WAIT};
use crate::domain::store::{ExpiryPolicy, DEFAULT_EXPIRE, MAX_EXPIRE};
use crate::domain::DomainError;
use crate::infrastructure::store::{StoreConfig, StoreType};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub repository: RepositorySettings,
    pub lock: LockSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: String,
    pub redis_url: Option<String>,
    pub database: Option<i64>,
    pub key_prefix: Option<String>,
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    pub prefix: String,
    pub default_expiry_secs: u64,
    pub max_expiry_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    pub hold_secs: u64,
    pub wait_secs: u64,
    pub poll_millis: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreType::default().to_string(),
            redis_url: None,
            database: None,
            key_prefix: None,
            max_capacity: 10_000,
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            default_expiry_secs: DEFAULT_EXPIRE.as_secs(),
            max_expiry_secs: MAX_EXPIRE.as_secs(),
        }
    }
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            hold_secs: DEFAULT_HOLD.as_secs(),
            wait_secs: DEFAULT_WAIT.as_secs(),
            poll_millis: DEFAULT_POLL.as_millis() as u64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads and validates the configuration
    ///
    /// Unparseable or inconsistent values are [`DomainError::Configuration`] errors.
    pub fn load() -> Result<Self, DomainError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to load configuration: {}", e)))?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self, DomainError> {
        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| DomainError::configuration(format!("Invalid configuration: {}", e)))?;

        app_config.store_config()?;
        app_config.expiry_policy()?;
        app_config.lock_options()?;

        Ok(app_config)
    }

    /// Store backend settings for [`crate::infrastructure::store::StoreFactory`]
    pub fn store_config(&self) -> Result<StoreConfig, DomainError> {
        let store_type: StoreType = self.store.backend.parse()?;

        Ok(StoreConfig {
            store_type,
            redis_url: self.store.redis_url.clone(),
            database: self.store.database,
            key_prefix: self.store.key_prefix.clone(),
            max_capacity: Some(self.store.max_capacity),
            ..Default::default()
        })
    }

    pub fn expiry_policy(&self) -> Result<ExpiryPolicy, DomainError> {
        ExpiryPolicy::new(
            Duration::from_secs(self.repository.default_expiry_secs),
            Duration::from_secs(self.repository.max_expiry_secs),
        )
    }

    pub fn lock_options(&self) -> Result<LockOptions, DomainError> {
        let options = LockOptions::new(
            Duration::from_secs(self.lock.hold_secs),
            Duration::from_secs(self.lock.wait_secs),
        )
        .with_poll(Duration::from_millis(self.lock.poll_millis));

        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.repository.prefix, "redisRepo");
        assert_eq!(config.repository.default_expiry_secs, 14_400);
        assert_eq!(config.repository.max_expiry_secs, 2_678_400);
        assert_eq!(config.lock.hold_secs, 30);
        assert_eq!(config.lock.wait_secs, 35);
        assert_eq!(config.lock.poll_millis, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_store_config_from_settings() {
        let mut config = AppConfig::default();
        config.store.backend = "redis".to_string();
        config.store.redis_url = Some("redis://cache:6379".to_string());
        config.store.database = Some(4);

        let store = config.store_config().unwrap();
        assert_eq!(store.store_type, StoreType::Redis);
        assert_eq!(store.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(store.database, Some(4));
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let mut config = AppConfig::default();
        config.store.backend = "memcached".to_string();

        assert!(matches!(
            config.store_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_default_expiry_above_max_is_rejected() {
        let mut config = AppConfig::default();
        config.repository.default_expiry_secs = config.repository.max_expiry_secs + 1;

        assert!(config.expiry_policy().is_err());
    }

    #[test]
    fn test_lock_options() {
        let options = AppConfig::default().lock_options().unwrap();

        assert_eq!(options.hold, Duration::from_secs(30));
        assert_eq!(options.wait, Duration::from_secs(35));
        assert_eq!(options.poll, Duration::from_millis(10));
    }

    #[test]
    fn test_zero_poll_is_rejected() {
        let mut config = AppConfig::default();
        config.lock.poll_millis = 0;

        assert!(config.lock_options().is_err());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config = AppConfig::from_config(
            config::Config::builder()
                .set_override("repository.prefix", "articles")
                .unwrap()
                .set_override("logging.format", "json")
                .unwrap()
                .build()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.repository.prefix, "articles");
        assert_eq!(config.repository.default_expiry_secs, 14_400);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.backend, "in_memory");
    }

    #[test]
    fn test_unparseable_value_is_configuration_error() {
        let result = AppConfig::from_config(
            config::Config::builder()
                .set_override("store.backend", "redis")
                .unwrap()
                .set_override("lock.hold_secs", "abc")
                .unwrap()
                .build()
                .unwrap(),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_inconsistent_values_fail_at_load() {
        let result = AppConfig::from_config(
            config::Config::builder()
                .set_override("store.backend", "memcached")
                .unwrap()
                .build()
                .unwrap(),
        );
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        let result = AppConfig::from_config(
            config::Config::builder()
                .set_override("lock.hold_secs", 5_000_000_i64)
                .unwrap()
                .build()
                .unwrap(),
        );
        assert!(result.is_err());
    }
}
