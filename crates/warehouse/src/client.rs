//! DuckDB connection factory.

use crate::config::WarehouseConfig;
use duckdb::Connection;
use funnel_core::{Error, Result};
use tracing::debug;

/// Opens connections to the warehouse database file.
///
/// Holds no connection itself; every pipeline run opens its own and drops
/// it when the run ends.
#[derive(Debug, Clone)]
pub struct DuckDbClient {
    config: WarehouseConfig,
}

impl DuckDbClient {
    /// Creates a new client after validating relation names.
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Opens a read-write connection, creating the parent directory if needed.
    pub fn connect(&self) -> Result<Connection> {
        let path = &self.config.database_path;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::connection(format!("failed to create directory {:?}: {}", parent, e))
            })?;
        }

        let connection = Connection::open(path)
            .map_err(|e| Error::connection(format!("failed to open {:?}: {}", path, e)))?;

        debug!(path = %path.display(), "Opened DuckDB connection");
        Ok(connection)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }
}
