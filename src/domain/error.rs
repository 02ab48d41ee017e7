use std::time::Duration;

use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Connection error: can't connect to store at {target}: {message}")]
    Connection { target: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown operation '{name}'. Allowed operations: {}", allowed.join(", "))]
    UnknownOperation {
        name: String,
        allowed: Vec<&'static str>,
    },

    #[error("Lock failed: more than {} seconds", timeout.as_secs())]
    LockAcquireTimeout { timeout: Duration },

    #[error("Lock acquisition for '{key}' was cancelled")]
    LockCancelled { key: String },

    #[error("Generation error: {key} - {message}")]
    Generation { key: String, message: String },

    #[error(
        "Expiry of {} seconds exceeds the maximum of {} seconds",
        requested.as_secs(),
        max.as_secs()
    )]
    ExpiryTooLarge { requested: Duration, max: Duration },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl DomainError {
    pub fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_operation(name: impl Into<String>, allowed: Vec<&'static str>) -> Self {
        Self::UnknownOperation {
            name: name.into(),
            allowed,
        }
    }

    pub fn lock_timeout(timeout: Duration) -> Self {
        Self::LockAcquireTimeout { timeout }
    }

    pub fn lock_cancelled(key: impl Into<String>) -> Self {
        Self::LockCancelled { key: key.into() }
    }

    pub fn generation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn expiry_too_large(requested: Duration, max: Duration) -> Self {
        Self::ExpiryTooLarge { requested, max }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
