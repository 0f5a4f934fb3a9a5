//! 流水查询 API 处理器

use axum::{
    extract::{Query, State},
    Json,
};
use inventory::Movement;

use crate::dto::{ApiResponse, MovementQuery, PageResponse};
use crate::error::Result;
use crate::state::AppState;

/// 流水分页列表，按时间倒序
///
/// GET /api/movements
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<ApiResponse<PageResponse<Movement>>>> {
    let (filter, page) = query.into_parts();
    let movements = state.movements.list(filter, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(movements, page))))
}
