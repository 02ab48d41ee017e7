//! Spin-wait distributed lock over set-if-not-exists

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::store::StoreClient;
use crate::domain::DomainError;

use super::options::LockOptions;

/// Value stored under a held lock key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    /// Random holder token, compared on release
    pub token: String,
    /// Unix timestamp (seconds) at which the hold window ends
    pub deadline: i64,
}

/// Proof of a successful acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: String,
    raw: String,
}

impl LockHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Mutual exclusion on a named resource, shared across processes via the store
///
/// Acquisition polls `set-if-not-exists` at a fixed interval until it wins or the
/// wait budget is spent. The key always carries a TTL so a crashed holder can't
/// keep the resource forever. Not reentrant: a holder acquiring the same key
/// again waits for itself.
#[derive(Debug, Clone)]
pub struct SpinLock {
    client: StoreClient,
    defaults: LockOptions,
}

impl SpinLock {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            defaults: LockOptions::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: LockOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> LockOptions {
        self.defaults
    }

    /// Acquires `key` with the default options
    pub async fn acquire(&self, key: &str) -> Result<LockHandle, DomainError> {
        self.acquire_with(key, self.defaults).await
    }

    /// Acquires `key`, failing with [`DomainError::LockAcquireTimeout`] once `options.wait` is spent
    pub async fn acquire_with(
        &self,
        key: &str,
        options: LockOptions,
    ) -> Result<LockHandle, DomainError> {
        self.acquire_with_cancel(key, options, std::future::pending::<()>())
            .await
    }

    /// Like [`SpinLock::acquire_with`], but stops early with
    /// [`DomainError::LockCancelled`] when `cancel` resolves
    pub async fn acquire_with_cancel<C>(
        &self,
        key: &str,
        options: LockOptions,
        cancel: C,
    ) -> Result<LockHandle, DomainError>
    where
        C: Future<Output = ()>,
    {
        options.validate()?;

        let max_hold = self.client.expiry_policy().max_expiry();
        if options.hold > max_hold {
            return Err(DomainError::expiry_too_large(options.hold, max_hold));
        }

        tokio::pin!(cancel);

        let deadline = Instant::now() + options.wait;
        let token = Uuid::new_v4().to_string();
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            if let Some(handle) = self.try_acquire(key, &token, options.hold).await? {
                info!(key = %key, attempts, hold_secs = options.hold.as_secs(), "Lock acquired");
                return Ok(handle);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(key = %key, attempts, wait_secs = options.wait.as_secs(), "Lock acquisition timed out");
                return Err(DomainError::lock_timeout(options.wait));
            }

            debug!(key = %key, attempts, "Lock is held elsewhere, polling");

            let pause = options.poll.min(deadline - now);
            tokio::select! {
                _ = &mut cancel => {
                    info!(key = %key, attempts, "Lock acquisition cancelled");
                    return Err(DomainError::lock_cancelled(key));
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Releases a lock if this handle still owns it
    ///
    /// Returns `false` when the lock already expired or was taken over.
    pub async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let released = self
            .client
            .store()
            .delete_if_equals(&handle.key, &handle.raw)
            .await?;

        if released {
            info!(key = %handle.key, "Lock released");
        } else {
            warn!(key = %handle.key, "Lock was no longer held by this handle");
        }

        Ok(released)
    }

    /// Deletes the lock key regardless of who holds it
    pub async fn force_release(&self, key: &str) -> Result<bool, DomainError> {
        let released = self.client.delete(key).await?;
        info!(key = %key, released, "Lock force-released");
        Ok(released)
    }

    /// Reads the record of the current holder, if any
    pub async fn holder(&self, key: &str) -> Result<Option<LockRecord>, DomainError> {
        self.client.get(key).await
    }

    /// Runs `critical_section` while holding `key`
    ///
    /// The lock is released whether the section succeeds or fails.
    pub async fn with_lock<T, F, Fut>(
        &self,
        key: &str,
        options: LockOptions,
        critical_section: F,
    ) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let handle = self.acquire_with(key, options).await?;
        let outcome = critical_section().await;

        match self.release(&handle).await {
            Ok(_) => outcome,
            Err(e) if outcome.is_ok() => Err(e),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to release lock after failed critical section");
                outcome
            }
        }
    }

    async fn try_acquire(
        &self,
        key: &str,
        token: &str,
        hold: Duration,
    ) -> Result<Option<LockHandle>, DomainError> {
        let record = LockRecord {
            token: token.to_string(),
            deadline: Utc::now()
                .timestamp()
                .saturating_add(i64::try_from(hold.as_secs()).unwrap_or(i64::MAX)),
        };
        let raw = serde_json::to_string(&record)?;
        let store = self.client.store();

        if !store.set_nx_raw(key, &raw).await? {
            return Ok(None);
        }

        // set-if-not-exists and expire are two commands; never leave a lock without a TTL
        if let Err(e) = store.expire(key, hold).await {
            if let Err(cleanup) = store.delete_if_equals(key, &raw).await {
                warn!(key = %key, error = %cleanup, "Failed to remove lock without TTL");
            }
            return Err(e);
        }

        Ok(Some(LockHandle {
            key: key.to_string(),
            token: token.to_string(),
            raw,
        }))
    }
}
