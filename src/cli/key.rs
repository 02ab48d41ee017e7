//! Key command - prints the storage key for a logical key

use std::str::FromStr;

use clap::Args;

use crate::config::AppConfig;
use crate::domain::{KeyArg, KeyDeriver};

/// Arguments for the key command
#[derive(Args, Clone)]
pub struct KeyArgs {
    /// Logical key name
    pub name: String,

    /// Generator arguments (booleans, integers and floats are detected, the rest is text)
    #[arg(value_parser = KeyArg::from_str, allow_hyphen_values = true)]
    pub args: Vec<KeyArg>,

    /// Key prefix (overrides config)
    #[arg(long)]
    pub prefix: Option<String>,
}

/// Print the derived storage key
pub async fn run(args: KeyArgs, config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", storage_key(&args, config));
    Ok(())
}

pub(crate) fn storage_key(args: &KeyArgs, config: &AppConfig) -> String {
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| config.repository.prefix.clone());

    KeyDeriver::new(prefix).derive(&args.name, &args.args)
}
