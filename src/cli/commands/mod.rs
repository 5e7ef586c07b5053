//! CLI command implementations.

pub mod cache;
pub mod manifest;
pub mod pattern;
pub mod scan;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::sqlite::initialize_from_config;
use crate::adapters::SqliteKeyValueStore;
use crate::domain::models::Config;

/// Open the configured SQLite store, creating and migrating it if needed.
pub(crate) async fn open_store(config: &Config) -> Result<Arc<SqliteKeyValueStore>> {
    let pool = initialize_from_config(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    Ok(Arc::new(SqliteKeyValueStore::new(pool)))
}
