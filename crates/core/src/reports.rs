//! Aggregation result rows returned by the analytics queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purchases and revenue for one (product, week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub product: String,
    pub week: i64,
    pub purchases: i64,
    /// Absent when none of the sessions recorded an amount
    pub revenue: Option<i64>,
}

/// Sessions that reached each funnel step in one (year, week).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUsersRow {
    pub year: i64,
    pub week: i64,
    pub landing: i64,
    pub checkout: i64,
    pub login_options: i64,
    pub sign_up: i64,
    pub purchase: i64,
}

/// Conversion rate of one step in one (year, week).
///
/// Field order is the JSON order of the `/api/v1/main` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRow {
    /// Sessions whose steps contain the step
    pub total: i64,
    /// Sessions whose last step is the step
    pub dropped: i64,
    /// `(total - dropped) / total * 100`, two decimals
    pub conversion_rate: f64,
    pub step: String,
    pub week: i64,
    pub year: i64,
}

/// Distinct users per raw step value and week, read straight off the
/// flattened view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepValueUsersRow {
    pub step: Option<String>,
    pub users: i64,
    pub week: i64,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub revenue: Vec<RevenueRow>,
    pub users: Vec<StepUsersRow>,
    pub conversion: Vec<ConversionRow>,
}
