//! Blocking stage functions run against one connection.

use duckdb::Connection;
use funnel_core::{ConversionRow, Error, Result, RevenueRow, StepUsersRow};
use std::path::Path;
use tracing::{info, warn};
use warehouse::{
    build_session_table, conversion_rate_per_step_week, count_value_conflicts, create_flat_view,
    load_events, revenue_per_product_week, users_per_step_week, WarehouseConfig,
};

/// Row counts from a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub events: u64,
    pub sessions: u64,
    /// Session-week partitions with more than one product or currency
    pub conflicts: u64,
}

/// Output of the three analytics queries.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub revenue: Vec<RevenueRow>,
    pub users: Vec<StepUsersRow>,
    pub conversion: Vec<ConversionRow>,
}

/// Rebuilds the events table, flattened view, and session table.
pub fn rebuild(conn: &Connection, config: &WarehouseConfig, parquet: &Path) -> Result<RebuildSummary> {
    let events = load_events(conn, parquet, &config.events_table)?;
    create_flat_view(conn, &config.flat_view, &config.events_table)?;
    let sessions = build_session_table(
        conn,
        &config.session_table,
        &config.flat_view,
        config.week_split,
    )?;

    let conflicts = count_value_conflicts(conn, &config.flat_view)?;
    if conflicts > 0 {
        if config.strict_single_values {
            return Err(Error::conflict(format!(
                "{} session weeks carry more than one product or currency",
                conflicts
            )));
        }
        warn!(
            conflicts = conflicts,
            "Sessions with several products or currencies, keeping first seen"
        );
    }

    Ok(RebuildSummary {
        events,
        sessions,
        conflicts,
    })
}

/// Runs all analytics queries over freshly rebuilt relations.
pub fn analyze(conn: &Connection, config: &WarehouseConfig) -> Result<Analysis> {
    let revenue = revenue_per_product_week(conn, &config.session_table)?;
    let users = users_per_step_week(conn, &config.session_table)?;
    let conversion =
        conversion_rate_per_step_week(conn, &config.session_table, &config.flat_view)?;

    info!(
        revenue_rows = revenue.len(),
        user_rows = users.len(),
        conversion_rows = conversion.len(),
        "Analytics complete"
    );

    Ok(Analysis {
        revenue,
        users,
        conversion,
    })
}
