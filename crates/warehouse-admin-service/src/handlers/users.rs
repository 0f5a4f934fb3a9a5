//! 用户管理 API 处理器（仅管理员）

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use inventory::User;
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{ApiResponse, CreateUserRequest, PageResponse, UpdateUserRequest, UserQuery};
use crate::error::Result;
use crate::state::AppState;

/// 创建用户
///
/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;
    let user = state.users.create(req.into()).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 用户列表
///
/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<PageResponse<User>>>> {
    let (filter, page) = query.into_parts();
    let users = state.users.list(filter, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(users, page))))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users.get(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 更新用户
///
/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;
    let user = state.users.update(id, req.into(), claims.actor()?).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 删除用户（有操作记录时改为停用）
///
/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.users.delete(id, claims.actor()?).await?;
    Ok(Json(ApiResponse::success_empty()))
}
