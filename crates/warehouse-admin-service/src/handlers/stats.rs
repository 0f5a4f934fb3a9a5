//! 首页统计

use axum::{extract::State, Json};
use inventory::service::Overview;

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/stats/overview
pub async fn overview(State(state): State<AppState>) -> Result<Json<ApiResponse<Overview>>> {
    let overview = state.stats.overview().await?;
    Ok(Json(ApiResponse::success(overview)))
}
