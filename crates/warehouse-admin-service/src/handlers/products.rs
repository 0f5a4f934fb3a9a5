//! 产品 API 处理器
//!
//! 所有写操作都会带上当前登录用户作为操作人，状态机按角色放行

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use inventory::{Movement, Product};
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{
    ApiResponse, CancelProductRequest, CreateProductRequest, LocationTargetRequest,
    PageResponse, PaginationParams, ProductQuery, RemoveProductRequest, UpdateProductRequest,
    VersionRequest,
};
use crate::error::Result;
use crate::state::AppState;

/// 登记产品，带库位时直接上架
///
/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let product = state.products.create(req.into(), actor).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 产品分页列表
///
/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<PageResponse<Product>>>> {
    let (filter, page) = query.into_parts();
    let products = state.products.list(&filter, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(products, page))))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = state.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 修改产品信息，数量或重量变化会记录调整流水
///
/// PUT /api/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let (version, patch) = req.into_parts();
    let product = state.products.update(id, patch, version, actor).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 提交上架
///
/// POST /api/products/{id}/submit
pub async fn submit_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<VersionRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let actor = claims.actor()?;
    let product = state
        .products
        .submit_for_allocation(id, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 分配库位
///
/// POST /api/products/{id}/allocate
pub async fn allocate_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<LocationTargetRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let actor = claims.actor()?;
    let product = state
        .products
        .allocate(id, req.location_id, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 移库
///
/// POST /api/products/{id}/move
pub async fn move_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<LocationTargetRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let actor = claims.actor()?;
    let product = state
        .products
        .move_to(id, req.location_id, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 作废尚未上架的产品
///
/// POST /api/products/{id}/cancel
pub async fn cancel_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<CancelProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let product = state
        .products
        .cancel(id, req.reason, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// 移除产品（仅管理员），产品保留为 REMOVIDO 终态
///
/// DELETE /api/products/{id}
pub async fn remove_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<RemoveProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;
    let actor = claims.actor()?;
    let product = state
        .products
        .remove(id, req.reason, req.version, actor)
        .await?;
    Ok(Json(ApiResponse::success_with_message(product, "产品已移除")))
}

/// 产品流水
///
/// GET /api/products/{id}/history
pub async fn product_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Movement>>>> {
    let page = params.page_request();
    let movements = state.products.history(id, page).await?;
    Ok(Json(ApiResponse::success(PageResponse::from_paged(movements, page))))
}
