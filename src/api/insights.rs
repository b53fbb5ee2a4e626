//! Statistics endpoints - on-demand views over the entry log
//!
//! These handlers just load the entries collection and hand it to the
//! aggregation engine; nothing is persisted.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Local;

use super::auth::require_api_key;
use super::error::ApiError;
use super::state::AppState;
use crate::stats::{self, Insights, MonthlyReport};

/// GET /stats/insights - aggregates over the whole entry log
pub async fn get_insights(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Insights>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let entries = state.store.load_entries()?;
    Ok(Json(stats::insights(&entries)))
}

/// GET /stats/monthly/:year/:month - report over one calendar month.
/// The embedded weekly trend ends at today, matching the insights view.
pub async fn get_monthly_report(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    headers: HeaderMap,
) -> Result<Json<MonthlyReport>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let entries = state.store.load_entries()?;
    let today = Local::now().date_naive();
    Ok(Json(stats::monthly_report(&entries, year, month, today)))
}
