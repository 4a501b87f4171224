//! DuckDB storage for the funnel pipeline.
//!
//! Every relation is rebuilt with `CREATE OR REPLACE`:
//! - `events`: typed copy of the parquet source
//! - `events_unnested`: one row per event param (view)
//! - `my_table`: one row per session and ISO week

pub mod client;
pub mod config;
pub mod health;
pub mod query;
pub mod sample;
pub mod schema;

pub use client::*;
pub use config::*;
pub use query::*;
pub use schema::{build_session_table, count_value_conflicts, create_flat_view, load_events};

/// Maps a DuckDB failure to a query error on `relation`.
pub(crate) fn query_error(relation: &str) -> impl FnOnce(duckdb::Error) -> funnel_core::Error + '_ {
    move |e| funnel_core::Error::query(relation, e.to_string())
}
