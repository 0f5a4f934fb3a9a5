//! 库位管理 API 处理器

use axum::{
    extract::{Path, Query, State},
    Json,
};
use inventory::{Location, Movement};
use validator::Validate;

use crate::dto::{
    ApiResponse, AvailableLocationQuery, CreateLocationRequest, LocationQuery, PageResponse,
    PaginationParams, UpdateLocationRequest,
};
use crate::error::Result;
use crate::state::AppState;

/// 创建单个库位
///
/// POST /api/locations
pub async fn create_location(
    State(state): State<AppState>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<ApiResponse<Location>>> {
    req.validate()?;
    let location = state.locations.create(req.into()).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// 库位列表
///
/// GET /api/locations
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<ApiResponse<Vec<Location>>>> {
    let locations = state.locations.list(&query.into()).await?;
    Ok(Json(ApiResponse::success(locations)))
}

/// 可放入指定重量的空闲库位
///
/// GET /api/locations/available
pub async fn list_available(
    State(state): State<AppState>,
    Query(query): Query<AvailableLocationQuery>,
) -> Result<Json<ApiResponse<Vec<Location>>>> {
    let locations = state
        .locations
        .available(query.chamber_id, query.weight_kg)
        .await?;
    Ok(Json(ApiResponse::success(locations)))
}

/// GET /api/locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Location>>> {
    let location = state.locations.get(id).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// 修改承重或启停
///
/// PUT /api/locations/{id}
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<Location>>> {
    req.validate()?;
    let location = state.locations.update(id, req.into()).await?;
    Ok(Json(ApiResponse::success(location)))
}

/// 删除空闲库位
///
/// DELETE /api/locations/{id}
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.locations.delete(id).await?;
    Ok(Json(ApiResponse::success_empty()))
}

/// 库位流水
///
/// GET /api/locations/{id}/movements
pub async fn location_movements(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Movement>>>> {
    let page = params.page_request();
    let movements = state.movements.for_location(id, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(movements, page))))
}
