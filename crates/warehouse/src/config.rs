//! DuckDB warehouse configuration.

use funnel_core::{Error, Result, WeekSplit};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Warehouse configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// DuckDB database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Table the parquet source is loaded into
    #[serde(default = "default_events_table")]
    pub events_table: String,
    /// View exposing one row per event param
    #[serde(default = "default_flat_view")]
    pub flat_view: String,
    /// Per-session aggregate table
    #[serde(default = "default_session_table")]
    pub session_table: String,
    /// Policy for sessions spanning several weeks.
    ///
    /// The default, [`WeekSplit::FanOut`], keeps a row per (session, year,
    /// week), so a session crossing a week boundary appears once per week.
    /// [`WeekSplit::FirstWeek`] restores at most one row per session by
    /// keeping only its earliest week.
    #[serde(default)]
    pub week_split: WeekSplit,
    /// Fail the run when a session has several distinct products or currencies
    #[serde(default)]
    pub strict_single_values: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/data.db")
}

fn default_events_table() -> String {
    "events".to_string()
}

fn default_flat_view() -> String {
    "events_unnested".to_string()
}

fn default_session_table() -> String {
    "my_table".to_string()
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            events_table: default_events_table(),
            flat_view: default_flat_view(),
            session_table: default_session_table(),
            week_split: WeekSplit::default(),
            strict_single_values: false,
        }
    }
}

impl WarehouseConfig {
    /// Creates a config with default relation names for the given database file.
    pub fn with_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Checks that every relation name is a plain SQL identifier.
    ///
    /// Names are spliced into DDL, so anything else is rejected.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.events_table)?;
        validate_identifier(&self.flat_view)?;
        validate_identifier(&self.session_table)?;
        Ok(())
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::config(format!("invalid relation name: {:?}", name)))
    }
}
