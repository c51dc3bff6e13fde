//! `migrate` command: bring the database schema up to date and exit.

use crate::config::Config;
use crate::db::Database;
use anyhow::Result;
use tracing::info;

/// Open (creating if needed) the configured database, applying any pending
/// embedded migrations.
pub fn run_migrate(config: &Config) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    let version = db.schema_version()?;

    info!(version, "Schema up to date");
    println!(
        "Database {} is at schema version {}",
        config.server.db_path.display(),
        version
    );
    Ok(())
}
