//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, LockSettings, LogFormat, LoggingConfig, RepositorySettings, StoreSettings,
};
