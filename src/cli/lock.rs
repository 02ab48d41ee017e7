//! Lock commands - acquire or force-release a named lock

use std::time::Duration;

use clap::Args;
use tracing::info;

use crate::config::AppConfig;

/// Arguments for the lock command
#[derive(Args, Clone)]
pub struct LockArgs {
    /// Resource name used as the lock key
    pub resource: String,

    /// Hold time in seconds (overrides config)
    #[arg(long)]
    pub hold: Option<u64>,

    /// Maximum wait in seconds (overrides config)
    #[arg(long)]
    pub wait: Option<u64>,
}

/// Arguments for the unlock command
#[derive(Args, Clone)]
pub struct UnlockArgs {
    /// Resource name used as the lock key
    pub resource: String,
}

/// Acquire the lock and leave it to expire after the hold time
pub async fn run(args: LockArgs, config: &AppConfig) -> anyhow::Result<()> {
    let client = crate::connect(config).await?;
    let lock = crate::create_lock(config, client)?;

    let mut options = lock.defaults();
    if let Some(hold) = args.hold {
        options = options.with_hold(Duration::from_secs(hold));
    }
    if let Some(wait) = args.wait {
        options = options.with_wait(Duration::from_secs(wait));
    }

    let handle = lock.acquire_with(&args.resource, options).await?;
    info!(key = %handle.key(), hold_secs = options.hold.as_secs(), "Lock held until expiry");

    println!("{}", handle.token());
    Ok(())
}

/// Delete the lock key regardless of who holds it
pub async fn unlock(args: UnlockArgs, config: &AppConfig) -> anyhow::Result<()> {
    let client = crate::connect(config).await?;
    let lock = crate::create_lock(config, client)?;

    if lock.force_release(&args.resource).await? {
        println!("released {}", args.resource);
    } else {
        println!("{} was not held", args.resource);
    }

    Ok(())
}
