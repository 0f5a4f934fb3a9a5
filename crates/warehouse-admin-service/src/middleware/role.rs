//! 角色检查中间件
//!
//! 管理员满足所有角色要求

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use inventory::UserRole;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;

use crate::auth::Claims;

/// 角色检查中间件工厂
///
/// # 示例
/// ```ignore
/// .route("/chambers", post(create_chamber).layer(axum::middleware::from_fn(require_role(UserRole::Admin))))
/// ```
pub fn require_role(
    required: UserRole,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>>
       + Clone
       + Send
       + Sync
       + 'static {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move { check_role(request, next, required).await })
    }
}

async fn check_role(request: Request<Body>, next: Next, required: UserRole) -> Response {
    // Claims 由 auth_middleware 注入
    let role = match request.extensions().get::<Claims>() {
        Some(claims) => claims.role,
        None => return error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "未认证"),
    };

    if role.satisfies(required) {
        return next.run(request).await;
    }

    error_response(
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
        &format!("需要 {} 角色", required),
    )
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": code,
        "message": message,
        "data": null
    });

    (status, axum::Json(body)).into_response()
}
