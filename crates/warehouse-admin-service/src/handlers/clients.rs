//! 客户管理 API 处理器

use axum::{
    extract::{Path, Query, State},
    Json,
};
use inventory::Client;
use validator::Validate;

use crate::dto::{ApiResponse, ClientQuery, CreateClientRequest, PageResponse, UpdateClientRequest};
use crate::error::Result;
use crate::state::AppState;

/// 创建客户
///
/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<ApiResponse<Client>>> {
    req.validate()?;
    let client = state.clients.create(req.into()).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// 客户列表
///
/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Result<Json<ApiResponse<PageResponse<Client>>>> {
    let (filter, page) = query.into_parts();
    let clients = state.clients.list(filter, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(clients, page))))
}

/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Client>>> {
    let client = state.clients.get(id).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// PUT /api/clients/{id}
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<Client>>> {
    req.validate()?;
    let client = state.clients.update(id, req.into()).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// 删除客户
///
/// DELETE /api/clients/{id}
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.clients.delete(id).await?;
    Ok(Json(ApiResponse::success_empty()))
}
