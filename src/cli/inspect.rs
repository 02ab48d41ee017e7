//! Inspect command - shows what is stored under a logical key

use std::str::FromStr;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::{KeyArg, KeyDeriver};

/// Arguments for the inspect command
#[derive(Args, Clone)]
pub struct InspectArgs {
    /// Logical key name
    pub name: String,

    /// Generator arguments
    #[arg(value_parser = KeyArg::from_str, allow_hyphen_values = true)]
    pub args: Vec<KeyArg>,
}

/// Print the storage key, the raw stored value and its remaining TTL
pub async fn run(args: InspectArgs, config: &AppConfig) -> anyhow::Result<()> {
    let client = crate::connect(config).await?;
    let key = KeyDeriver::new(config.repository.prefix.clone()).derive(&args.name, &args.args);

    let raw = client.store().get_raw(&key).await?;
    let ttl = client.store().ttl(&key).await?;

    println!("key:   {}", key);
    match raw {
        Some(value) => println!("value: {}", value),
        None => println!("value: (miss)"),
    }
    match ttl {
        Some(remaining) => println!("ttl:   {}s", remaining.as_secs()),
        None => println!("ttl:   -"),
    }

    Ok(())
}
