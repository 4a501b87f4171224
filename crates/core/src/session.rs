//! Per-session funnel state.

use serde::{Deserialize, Serialize};

/// How a session whose events span several ISO weeks is collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekSplit {
    /// One row per (session, year, week) partition.
    #[default]
    FanOut,
    /// Only the earliest (year, week) partition of each session survives.
    FirstWeek,
}

/// One row of the session table: a session collapsed over a week partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWeek {
    pub session_id: i64,
    pub user_pseudo_id: String,
    pub week: i64,
    pub year: i64,
    /// Step names in event order
    pub steps: Vec<String>,
    pub product: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}
