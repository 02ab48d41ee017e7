//! Lock domain - Spin-wait mutual exclusion over the key-value store

mod options;
mod spin_lock;

pub use options::{LockOptions, DEFAULT_HOLD, DEFAULT_POLL, DEFAULT_WAIT};
pub use spin_lock::{LockHandle, LockRecord, SpinLock};
