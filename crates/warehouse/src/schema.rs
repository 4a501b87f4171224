//! Relation builders: events table, flattened view, session table.
//!
//! Each builder fully replaces its relation. Relation names are validated
//! identifiers (see [`crate::config::validate_identifier`]).

use duckdb::Connection;
use funnel_core::{Error, Result, WeekSplit, AMOUNT_KEY, CURRENCY_KEY, PRODUCT_KEY, STEP_KEY};
use std::path::Path;
use tracing::{debug, info};

use crate::query_error;

/// Column casts applied to the parquet source.
const EVENTS_PROJECTION: &str = r#"
    "event_timestamp"::BIGINT AS event_timestamp,
    "event_name"::VARCHAR AS event_name,
    "event_params"::STRUCT(
        key VARCHAR,
        value STRUCT(int_value INTEGER, string_value VARCHAR)
    )[] AS event_params,
    "user_id"::VARCHAR AS user_id,
    "user_pseudo_id"::VARCHAR AS user_pseudo_id,
    "session_id"::BIGINT AS session_id
"#;

/// ISO year of the event, paired with [`WEEK_EXPR`].
pub const YEAR_EXPR: &str = "isoyear(epoch_ms(event_timestamp))";

/// ISO week of the event.
pub const WEEK_EXPR: &str = "week(epoch_ms(event_timestamp))";

/// Order of flattened rows within a session: time, then source position.
const EVENT_ORDER: &str = "event_timestamp, event_index, param_index";

/// Quotes a string as a SQL literal.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Loads the parquet file at `source_path` into `table`, replacing it.
///
/// Returns the number of events loaded.
pub fn load_events(conn: &Connection, source_path: &Path, table: &str) -> Result<u64> {
    if !source_path.is_file() {
        return Err(Error::schema(format!(
            "source file not found: {}",
            source_path.display()
        )));
    }

    let path = source_path.to_string_lossy();
    let sql = format!(
        "CREATE OR REPLACE TABLE {table} AS SELECT {EVENTS_PROJECTION} FROM read_parquet({})",
        sql_literal(&path)
    );

    conn.execute_batch(&sql)
        .map_err(|e| Error::schema(format!("failed to load {}: {}", path, e)))?;

    let count: i64 = conn
        .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))
        .map_err(query_error(table))?;

    info!(table = table, rows = count, "Loaded events");
    Ok(count as u64)
}

/// Defines `view` with one row per entry of `event_params`.
///
/// `event_index` is the event's row in `events_table`, which follows source
/// file order, and `param_index` the 1-based position within
/// `event_params`. Together with `event_timestamp` they give a total order.
pub fn create_flat_view(conn: &Connection, view: &str, events_table: &str) -> Result<()> {
    let sql = format!(
        r#"
        CREATE OR REPLACE VIEW {view} AS
        SELECT
            event_timestamp,
            event_name,
            rowid AS event_index,
            generate_subscripts(event_params, 1) AS param_index,
            UNNEST(event_params).key AS key,
            UNNEST(event_params).value.int_value AS int_value,
            UNNEST(event_params).value.string_value AS string_value,
            user_id,
            user_pseudo_id,
            session_id
        FROM {events_table}
        "#
    );

    conn.execute_batch(&sql).map_err(query_error(view))?;

    debug!(view = view, "Created flattened view");
    Ok(())
}

/// Builds `table` with one row per session and ISO week from `view`.
///
/// Steps keep event order. Product and currency take the first value seen;
/// see [`count_value_conflicts`] for sessions that disagree with that.
pub fn build_session_table(
    conn: &Connection,
    table: &str,
    view: &str,
    week_split: WeekSplit,
) -> Result<u64> {
    let step = sql_literal(STEP_KEY);
    let product = sql_literal(PRODUCT_KEY);
    let amount = sql_literal(AMOUNT_KEY);
    let currency = sql_literal(CURRENCY_KEY);

    let qualify = match week_split {
        WeekSplit::FanOut => "",
        WeekSplit::FirstWeek => {
            "QUALIFY row_number() OVER (PARTITION BY session_id ORDER BY year, week) = 1"
        }
    };

    let sql = format!(
        r#"
        CREATE OR REPLACE TABLE {table} AS
        WITH partitioned AS (
            SELECT *, {YEAR_EXPR} AS year, {WEEK_EXPR} AS week
            FROM {view}
        ),
        sessions AS (
            SELECT
                session_id,
                first(user_pseudo_id ORDER BY {EVENT_ORDER}) AS user_pseudo_id,
                week,
                year,
                list(string_value ORDER BY {EVENT_ORDER})
                    FILTER (WHERE key = {step} AND string_value IS NOT NULL) AS steps,
                first(string_value ORDER BY {EVENT_ORDER})
                    FILTER (WHERE key = {product} AND string_value IS NOT NULL) AS product,
                CAST(sum(int_value) FILTER (WHERE key = {amount}) AS BIGINT) AS amount,
                first(string_value ORDER BY {EVENT_ORDER})
                    FILTER (WHERE key = {currency} AND string_value IS NOT NULL) AS currency
            FROM partitioned
            GROUP BY session_id, year, week
        )
        SELECT * FROM sessions
        {qualify}
        ORDER BY session_id, year, week
        "#
    );

    conn.execute_batch(&sql).map_err(query_error(table))?;

    let count: i64 = conn
        .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))
        .map_err(query_error(table))?;

    info!(table = table, rows = count, split = ?week_split, "Built session table");
    Ok(count as u64)
}

/// Counts (session, week, key) partitions with more than one distinct
/// product or currency value.
pub fn count_value_conflicts(conn: &Connection, view: &str) -> Result<u64> {
    let sql = format!(
        r#"
        SELECT count(*) FROM (
            SELECT session_id
            FROM {view}
            WHERE key IN ({}, {}) AND string_value IS NOT NULL
            GROUP BY session_id, {YEAR_EXPR}, {WEEK_EXPR}, key
            HAVING count(DISTINCT string_value) > 1
        )
        "#,
        sql_literal(PRODUCT_KEY),
        sql_literal(CURRENCY_KEY),
    );

    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(query_error(view))?;
    Ok(count as u64)
}
