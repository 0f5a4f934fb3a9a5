//! 认证相关的 HTTP 处理器
//!
//! 提供登录、获取当前用户、刷新 Token 和修改密码的 API

use axum::{extract::State, Extension, Json};
use inventory::{InventoryError, User};
use tracing::info;
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, TokenResponse};
use crate::error::Result;
use crate::state::AppState;

/// 用户登录
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let user = state.users.authenticate(&req.email, &req.password).await?;
    let (token, expires_at) = state.jwt_manager.generate_token(&user)?;

    info!(user_id = user.id, role = %user.role, "用户登录");
    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_at,
        user,
    })))
}

/// 当前登录用户
///
/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users.get(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// 刷新 Token
///
/// POST /api/auth/refresh
///
/// 以当前库中的用户信息重新签发，角色变更和停用立即生效
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<TokenResponse>>> {
    let user = state.users.get(claims.user_id()?).await?;
    if !user.active {
        return Err(InventoryError::UserDisabled.into());
    }

    let (token, expires_at) = state.jwt_manager.generate_token(&user)?;
    Ok(Json(ApiResponse::success(TokenResponse { token, expires_at })))
}

/// 修改自己的密码
///
/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    state
        .users
        .change_password(claims.user_id()?, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::success_empty()))
}
