//! Funnel report endpoints.
//!
//! Every request runs the whole pipeline: download, rebuild, analyze.
//! Nothing is cached between requests.

use axum::{
    extract::{Path, State},
    Json,
};
use funnel_core::{ConversionRow, FunnelStep, RevenueRow, StepUsersRow};
use tracing::info;

use crate::response::ApiError;
use crate::state::AppState;

/// GET /api/v1/main - Conversion rate per step per week.
pub async fn main_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversionRow>>, ApiError> {
    let report = state.pipeline.run().await?;

    info!(
        run_id = %report.run_id,
        rows = report.conversion.len(),
        "Served conversion report"
    );
    Ok(Json(report.conversion))
}

/// GET /api/v1/revenue - Purchases and revenue per product per week.
pub async fn revenue_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<RevenueRow>>, ApiError> {
    let report = state.pipeline.run().await?;
    Ok(Json(report.revenue))
}

/// GET /api/v1/users - Sessions per funnel step per week.
pub async fn users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<StepUsersRow>>, ApiError> {
    let report = state.pipeline.run().await?;
    Ok(Json(report.users))
}

/// GET /api/v1/conversion/:step - Conversion rate of one step per week.
///
/// Known steps may be given by report column (`sign_up`) or recorded name
/// (`sign-up`). Other values are matched verbatim.
pub async fn step_conversion_handler(
    State(state): State<AppState>,
    Path(step): Path<String>,
) -> Result<Json<Vec<ConversionRow>>, ApiError> {
    let step = step
        .parse::<FunnelStep>()
        .map(|known| known.to_string())
        .unwrap_or(step);
    let rows = state.pipeline.run_for_step(step).await?;
    Ok(Json(rows))
}
