mod cli;
mod commands;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use shiori_api::{MangaClient, TokenStore};
use shiori_core::config::AppConfig;
use shiori_core::storage::TokenDb;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "shiori=debug,shiori_api=debug,shiori_core=debug"
    } else {
        "shiori=info,shiori_api=info,shiori_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::InitConfig { force } = cli.command {
        return commands::init_config(&AppConfig::config_path(), force);
    }

    let config = AppConfig::load()?;
    let backend = cli.backend.unwrap_or(config.general.backend);

    let db_path = AppConfig::ensure_db_path()?;
    tracing::debug!(path = %db_path.display(), %backend, "Opening token database");
    let store: Arc<dyn TokenStore> = Arc::new(TokenDb::open(&db_path)?);

    let client = MangaClient::new(backend, store, &config.client_options());
    commands::run(&client, cli.command).await
}
