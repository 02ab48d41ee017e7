//! Lock acquisition options

use std::time::Duration;

use crate::domain::store::MAX_EXPIRE;
use crate::domain::DomainError;

/// How long a lock is held before it expires on its own
pub const DEFAULT_HOLD: Duration = Duration::from_secs(30);

/// How long `acquire` keeps polling before giving up
pub const DEFAULT_WAIT: Duration = Duration::from_secs(35);

/// Delay between two acquisition attempts
pub const DEFAULT_POLL: Duration = Duration::from_millis(10);

/// Hold window, wait budget and polling interval for one acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub hold: Duration,
    pub wait: Duration,
    pub poll: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            hold: DEFAULT_HOLD,
            wait: DEFAULT_WAIT,
            poll: DEFAULT_POLL,
        }
    }
}

impl LockOptions {
    pub fn new(hold: Duration, wait: Duration) -> Self {
        Self {
            hold,
            wait,
            ..Default::default()
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// A zero hold would delete the lock as soon as it is taken
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.hold.is_zero() {
            return Err(DomainError::configuration("Lock hold duration must be positive"));
        }

        if self.hold > MAX_EXPIRE {
            return Err(DomainError::expiry_too_large(self.hold, MAX_EXPIRE));
        }

        if self.poll.is_zero() {
            return Err(DomainError::configuration("Lock poll interval must be positive"));
        }

        Ok(())
    }
}
