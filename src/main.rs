//! Taskflow server binary.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use taskflow::api::start_server;
use taskflow::cli::{Cli, Command, migrate};
use taskflow::config::Config;
use taskflow::db::Database;
use taskflow::logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log, cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Some(Command::Migrate) => migrate::run_migrate(&config)?,
        Some(Command::Serve) | None => run_server(config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!("Database opened at {}", config.server.db_path.display());

    let server = start_server(db, &config.server.host, config.server.port).await?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, stopping");
    server.shutdown().await;

    Ok(())
}
