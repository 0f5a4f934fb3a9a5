//! 出库申请 API 处理器

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use inventory::WithdrawalRequest;
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{
    ApiResponse, CreateWithdrawalRequest, DecisionRequest, PageResponse, WithdrawalQuery,
};
use crate::error::Result;
use crate::state::AppState;

/// 发起出库申请
///
/// POST /api/withdrawals
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalRequest>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let withdrawal = state
        .withdrawals
        .request(req.product_id, req.quantity, req.reason, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success(withdrawal)))
}

/// GET /api/withdrawals
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Query(query): Query<WithdrawalQuery>,
) -> Result<Json<ApiResponse<PageResponse<WithdrawalRequest>>>> {
    let (filter, page) = query.into_parts();
    let withdrawals = state.withdrawals.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(
        withdrawals,
        page,
    ))))
}

/// GET /api/withdrawals/{id}
pub async fn get_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WithdrawalRequest>>> {
    let withdrawal = state.withdrawals.get(id).await?;
    Ok(Json(ApiResponse::success(withdrawal)))
}

/// 批准出库（仅管理员）
///
/// POST /api/withdrawals/{id}/approve
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<WithdrawalRequest>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let withdrawal = state.withdrawals.approve(id, req.note, actor).await?;
    Ok(Json(ApiResponse::success(withdrawal)))
}

/// 驳回出库（仅管理员）
///
/// POST /api/withdrawals/{id}/reject
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApiResponse<WithdrawalRequest>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let withdrawal = state.withdrawals.reject(id, req.note, actor).await?;
    Ok(Json(ApiResponse::success(withdrawal)))
}

/// 撤回申请，申请人或管理员可操作
///
/// POST /api/withdrawals/{id}/cancel
pub async fn cancel_withdrawal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<WithdrawalRequest>>> {
    let actor = claims.actor()?;
    let withdrawal = state.withdrawals.cancel(id, actor).await?;
    Ok(Json(ApiResponse::success(withdrawal)))
}
