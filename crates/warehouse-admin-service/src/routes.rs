//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射。登录之外的 /api 路由都需要认证，
//! 管理员专属的写操作在路由上单独挂载角色检查。

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
};
use inventory::UserRole;
use storage_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    middleware::{auth_middleware, require_role},
    state::AppState,
};

/// 构建认证相关的路由
///
/// 登录为公开路由，其余需要有效 Token
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
}

/// 用户管理路由，全部仅管理员
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users", post(handlers::users::create_user))
        .route("/users/{id}", get(handlers::users::get_user))
        .route("/users/{id}", put(handlers::users::update_user))
        .route("/users/{id}", delete(handlers::users::delete_user))
        .route_layer(from_fn(require_role(UserRole::Admin)))
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(handlers::clients::list_clients))
        .route("/clients", post(handlers::clients::create_client))
        .route("/clients/{id}", get(handlers::clients::get_client))
        .route("/clients/{id}", put(handlers::clients::update_client))
        .route("/clients/{id}", delete(handlers::clients::delete_client))
}

/// 冷库路由，查询开放给所有登录用户
fn chamber_routes() -> Router<AppState> {
    Router::new()
        .route("/chambers", get(handlers::chambers::list_chambers))
        .route(
            "/chambers",
            post(handlers::chambers::create_chamber)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route("/chambers/{id}", get(handlers::chambers::get_chamber))
        .route(
            "/chambers/{id}",
            put(handlers::chambers::update_chamber)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/chambers/{id}",
            delete(handlers::chambers::delete_chamber)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/chambers/{id}/status",
            patch(handlers::chambers::update_chamber_status)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/chambers/{id}/occupancy",
            get(handlers::chambers::get_occupancy),
        )
        .route(
            "/chambers/{id}/locations/generate",
            post(handlers::chambers::generate_locations)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
}

fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(handlers::locations::list_locations))
        .route("/locations", post(handlers::locations::create_location))
        .route(
            "/locations/available",
            get(handlers::locations::list_available),
        )
        .route("/locations/{id}", get(handlers::locations::get_location))
        .route("/locations/{id}", put(handlers::locations::update_location))
        .route(
            "/locations/{id}",
            delete(handlers::locations::delete_location),
        )
        .route(
            "/locations/{id}/movements",
            get(handlers::locations::location_movements),
        )
}

/// 产品路由，移除仅管理员
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products", post(handlers::products::create_product))
        .route("/products/{id}", get(handlers::products::get_product))
        .route("/products/{id}", put(handlers::products::update_product))
        .route(
            "/products/{id}",
            delete(handlers::products::remove_product)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/products/{id}/submit",
            post(handlers::products::submit_product),
        )
        .route(
            "/products/{id}/allocate",
            post(handlers::products::allocate_product),
        )
        .route("/products/{id}/move", post(handlers::products::move_product))
        .route(
            "/products/{id}/cancel",
            post(handlers::products::cancel_product),
        )
        .route(
            "/products/{id}/history",
            get(handlers::products::product_history),
        )
}

/// 出库申请路由，审批仅管理员
fn withdrawal_routes() -> Router<AppState> {
    Router::new()
        .route("/withdrawals", get(handlers::withdrawals::list_withdrawals))
        .route(
            "/withdrawals",
            post(handlers::withdrawals::create_withdrawal),
        )
        .route(
            "/withdrawals/{id}",
            get(handlers::withdrawals::get_withdrawal),
        )
        .route(
            "/withdrawals/{id}/approve",
            post(handlers::withdrawals::approve_withdrawal)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/withdrawals/{id}/reject",
            post(handlers::withdrawals::reject_withdrawal)
                .layer(from_fn(require_role(UserRole::Admin))),
        )
        .route(
            "/withdrawals/{id}/cancel",
            post(handlers::withdrawals::cancel_withdrawal),
        )
}

fn movement_routes() -> Router<AppState> {
    Router::new().route("/movements", get(handlers::movements::list_movements))
}

fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats/overview", get(handlers::stats::overview))
}

/// 构建完整的 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(client_routes())
        .merge(chamber_routes())
        .merge(location_routes())
        .merge(product_routes())
        .merge(withdrawal_routes())
        .merge(movement_routes())
        .merge(stats_routes())
}

/// 构建带认证和可观测性中间件的应用
///
/// 就绪探针、CORS 和安全头依赖部署环境，由 main 追加
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health_check))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn(obs_middleware::http_tracing))
        .layer(from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "warehouse-admin-service"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_construction() {
        let _auth = auth_routes();
        let _users = user_routes();
        let _clients = client_routes();
        let _chambers = chamber_routes();
        let _locations = location_routes();
        let _products = product_routes();
        let _withdrawals = withdrawal_routes();
        let _movements = movement_routes();
        let _stats = stats_routes();
        let _api = api_routes();
    }
}
