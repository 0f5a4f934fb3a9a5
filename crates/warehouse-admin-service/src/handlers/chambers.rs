//! 冷库管理 API 处理器
//!
//! 查询对所有登录用户开放，写操作仅管理员

use axum::{
    extract::{Path, State},
    Json,
};
use inventory::service::ChamberPatch;
use inventory::{Chamber, ChamberOccupancy};
use validator::Validate;

use crate::dto::{
    ApiResponse, ChamberStatusRequest, CreateChamberRequest, GenerateLocationsRequest,
    GeneratedLocations, UpdateChamberRequest,
};
use crate::error::Result;
use crate::state::AppState;

/// 创建冷库
///
/// POST /api/chambers
pub async fn create_chamber(
    State(state): State<AppState>,
    Json(req): Json<CreateChamberRequest>,
) -> Result<Json<ApiResponse<Chamber>>> {
    req.validate()?;
    let chamber = state.chambers.create(req.into()).await?;
    Ok(Json(ApiResponse::success(chamber)))
}

/// 冷库列表
///
/// GET /api/chambers
pub async fn list_chambers(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Chamber>>>> {
    let chambers = state.chambers.list().await?;
    Ok(Json(ApiResponse::success(chambers)))
}

/// GET /api/chambers/{id}
pub async fn get_chamber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Chamber>>> {
    let chamber = state.chambers.get(id).await?;
    Ok(Json(ApiResponse::success(chamber)))
}

/// 更新冷库
///
/// PUT /api/chambers/{id}
pub async fn update_chamber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateChamberRequest>,
) -> Result<Json<ApiResponse<Chamber>>> {
    req.validate()?;
    let patch = ChamberPatch::try_from(req)?;
    let chamber = state.chambers.update(id, patch).await?;
    Ok(Json(ApiResponse::success(chamber)))
}

/// 切换冷库状态
///
/// PATCH /api/chambers/{id}/status
pub async fn update_chamber_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ChamberStatusRequest>,
) -> Result<Json<ApiResponse<Chamber>>> {
    let chamber = state.chambers.set_status(id, req.status).await?;
    Ok(Json(ApiResponse::success(chamber)))
}

/// 删除冷库（连同空闲库位）
///
/// DELETE /api/chambers/{id}
pub async fn delete_chamber(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.chambers.delete(id).await?;
    Ok(Json(ApiResponse::success_empty()))
}

/// 冷库占用情况
///
/// GET /api/chambers/{id}/occupancy
pub async fn get_occupancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ChamberOccupancy>>> {
    let occupancy = state.chambers.occupancy(id).await?;
    Ok(Json(ApiResponse::success(occupancy)))
}

/// 按冷库尺寸批量生成库位，已存在的坐标跳过
///
/// POST /api/chambers/{id}/locations/generate
pub async fn generate_locations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<GenerateLocationsRequest>,
) -> Result<Json<ApiResponse<GeneratedLocations>>> {
    req.validate()?;
    let created = state
        .locations
        .generate_for_chamber(id, req.max_capacity_kg)
        .await?;
    Ok(Json(ApiResponse::success(GeneratedLocations {
        chamber_id: id,
        created,
    })))
}
