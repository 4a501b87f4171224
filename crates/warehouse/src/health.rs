//! Warehouse health checks.

use crate::client::DuckDbClient;
use tracing::{debug, error};

/// Check that the database file opens and answers a trivial query.
pub fn check_connection(client: &DuckDbClient) -> bool {
    let result = client.connect().and_then(|conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map_err(|e| funnel_core::Error::connection(e.to_string()))
    });

    match result {
        Ok(_) => {
            debug!("DuckDB connection healthy");
            true
        }
        Err(e) => {
            error!("DuckDB health check failed: {}", e);
            false
        }
    }
}
