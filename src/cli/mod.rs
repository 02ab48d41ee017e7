//! CLI module for the cache repository
//!
//! Provides subcommands for looking at a shared store from the outside:
//! - `key`: print the storage key for a logical key and its arguments
//! - `lock` / `unlock`: take or force-release a named lock
//! - `inspect`: show the raw cached value and its remaining TTL

pub mod inspect;
pub mod key;
pub mod lock;

use clap::{Parser, Subcommand};

/// Cache repository tooling
#[derive(Parser)]
#[command(name = "cache-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the derived storage key
    Key(key::KeyArgs),

    /// Acquire a lock and print the holder token
    Lock(lock::LockArgs),

    /// Force-release a lock regardless of holder
    Unlock(lock::UnlockArgs),

    /// Print the raw stored value and remaining TTL
    Inspect(inspect::InspectArgs),
}
