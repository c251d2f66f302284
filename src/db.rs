use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatastoreConfig;

/// Open the analytical store. Read-only stores are opened with SQLite's
/// read-only flag; writable ones create the file if it is missing.
pub async fn create_pool(config: &DatastoreConfig) -> Result<SqlitePool, anyhow::Error> {
    let in_memory = config.url.contains(":memory:");

    if !in_memory
        && !config.read_only
        && let Some(path) = config.url.strip_prefix("sqlite://")
        && let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .read_only(config.read_only && !in_memory)
        .create_if_missing(!config.read_only);

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    tracing::info!(
        "Datastore opened: {} (read_only={})",
        config.url,
        config.read_only
    );
    Ok(pool)
}
