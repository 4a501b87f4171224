//! Writes event records to a parquet file shaped like the upstream source.

use duckdb::Connection;
use funnel_core::{Error, Event, EventParam, Result};
use std::path::Path;

use crate::schema::sql_literal;

const STAGING_TABLE: &str = "sample_events";

/// Writes `events` to `path` as parquet with the source column layout.
///
/// Returns the number of events written.
pub fn write_events_parquet(events: &[Event], path: &Path) -> Result<usize> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::connection(format!("failed to open staging database: {}", e)))?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE {STAGING_TABLE} (
            event_timestamp BIGINT,
            event_name VARCHAR,
            event_params STRUCT(key VARCHAR, value STRUCT(int_value INTEGER, string_value VARCHAR))[],
            user_id VARCHAR,
            user_pseudo_id VARCHAR,
            session_id BIGINT
        )
        "#
    ))
    .map_err(|e| Error::query(STAGING_TABLE, e.to_string()))?;

    for event in events {
        conn.execute_batch(&format!(
            "INSERT INTO {STAGING_TABLE} VALUES ({}, {}, {}, {}, {}, {})",
            event.event_timestamp,
            sql_literal(&event.event_name),
            params_literal(&event.event_params),
            optional_literal(event.user_id.as_deref()),
            sql_literal(&event.user_pseudo_id),
            event.session_id,
        ))
        .map_err(|e| Error::query(STAGING_TABLE, e.to_string()))?;
    }

    conn.execute_batch(&format!(
        "COPY {STAGING_TABLE} TO {} (FORMAT PARQUET)",
        sql_literal(&path.to_string_lossy())
    ))
    .map_err(|e| Error::query(STAGING_TABLE, format!("parquet export failed: {}", e)))?;

    Ok(events.len())
}

fn optional_literal(value: Option<&str>) -> String {
    value.map(sql_literal).unwrap_or_else(|| "NULL".to_string())
}

fn params_literal(params: &[EventParam]) -> String {
    let entries = params
        .iter()
        .map(|p| {
            let int_value = p
                .value
                .int_value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "NULL".to_string());
            format!(
                "{{'key': {}, 'value': {{'int_value': CAST({} AS INTEGER), 'string_value': CAST({} AS VARCHAR)}}}}",
                sql_literal(&p.key),
                int_value,
                optional_literal(p.value.string_value.as_deref()),
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", entries)
}
