use cache_repository::cli::{self, Cli, Command};
use cache_repository::infrastructure::logging::init_logging;
use cache_repository::AppConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    match cli.command {
        Command::Key(args) => cli::key::run(args, &config).await,
        Command::Lock(args) => cli::lock::run(args, &config).await,
        Command::Unlock(args) => cli::lock::unlock(args, &config).await,
        Command::Inspect(args) => cli::inspect::run(args, &config).await,
    }
}
