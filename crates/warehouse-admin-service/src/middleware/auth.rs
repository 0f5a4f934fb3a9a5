//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token，按当前库中的用户状态刷新身份后注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use inventory::InventoryError;
use serde_json::json;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// 公开路由（不需要认证）
const PUBLIC_PATHS: [&str; 3] = ["/api/auth/login", "/health", "/ready"];

/// 认证中间件
///
/// 从 Authorization header 中提取 Bearer Token，验证后将 Claims 注入请求扩展。
/// Token 内的角色只作签发时的快照，每次请求都以库中用户的角色和启用状态为准。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized_response("缺少认证 Token");
    };

    let claims = match state.jwt_manager.verify_token(token) {
        Ok(claims) => claims,
        Err(e) => return unauthorized_response(&e.to_string()),
    };

    match refresh_claims(&state, claims).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(response) => response,
    }
}

/// 用库中的用户覆盖 Token 里的身份信息
///
/// 用户已删除返回 401，已停用返回 403
async fn refresh_claims(state: &AppState, mut claims: Claims) -> Result<Claims, Response> {
    let user_id = claims.user_id().map_err(IntoResponse::into_response)?;

    let user = match state.users.get(user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Err(unauthorized_response("用户不存在")),
        Err(e) => return Err(ApiError::from(e).into_response()),
    };
    if !user.active {
        return Err(ApiError::from(InventoryError::UserDisabled).into_response());
    }

    claims.role = user.role;
    claims.email = user.email;
    claims.name = user.name;
    Ok(claims)
}

/// 生成 401 未授权响应
fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, middleware::from_fn_with_state, routing::get};
    use inventory::service::{CreateUser, UserPatch, password::MIN_COST};
    use inventory::{Actor, LockoutPolicy, Repositories, User, UserRole, UserService};
    use tower::ServiceExt;

    use crate::auth::{JwtConfig, JwtManager};

    fn state() -> AppState {
        let repos = Repositories::in_memory();
        let users = UserService::new(&repos, LockoutPolicy::default()).with_password_cost(MIN_COST);
        AppState::new(&repos, users, JwtManager::new(JwtConfig::default()))
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/api/whoami",
                get(|Extension(claims): Extension<Claims>| async move {
                    format!("{} {}", claims.email, claims.role)
                }),
            )
            .route("/api/auth/login", get(|| async { "login" }))
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn create_user(state: &AppState, email: &str, role: UserRole) -> User {
        state
            .users
            .create(CreateUser {
                name: "Usuario".to_string(),
                email: email.to_string(),
                password: "Senha12345".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    async fn call(app: Router, uri: &str, authorization: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_public_path_skips_token() {
        let response = call(app(state()), "/api/auth/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_valid_token_injects_claims() {
        let state = state();
        let user = create_user(&state, "op@armazem.test", UserRole::Operador).await;
        let (token, _) = state.jwt_manager.generate_token(&user).unwrap();

        let response = call(app(state), "/api/whoami", Some(&format!("Bearer {}", token))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "op@armazem.test OPERADOR");
    }

    #[tokio::test]
    async fn test_role_comes_from_stored_user() {
        let state = state();
        let root = create_user(&state, "root@armazem.test", UserRole::Admin).await;
        let admin = create_user(&state, "chefe@armazem.test", UserRole::Admin).await;
        let (token, _) = state.jwt_manager.generate_token(&admin).unwrap();

        state
            .users
            .update(
                admin.id,
                UserPatch {
                    role: Some(UserRole::Operador),
                    ..Default::default()
                },
                Actor::new(root.id, UserRole::Admin),
            )
            .await
            .unwrap();

        let response = call(app(state), "/api/whoami", Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "chefe@armazem.test OPERADOR");
    }

    #[tokio::test]
    async fn test_deactivated_user_is_rejected() {
        let state = state();
        let root = create_user(&state, "root@armazem.test", UserRole::Admin).await;
        let user = create_user(&state, "op@armazem.test", UserRole::Operador).await;
        let (token, _) = state.jwt_manager.generate_token(&user).unwrap();

        state
            .users
            .update(
                user.id,
                UserPatch {
                    active: Some(false),
                    ..Default::default()
                },
                Actor::new(root.id, UserRole::Admin),
            )
            .await
            .unwrap();

        let response = call(app(state), "/api/whoami", Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_text(response).await.contains("USER_DISABLED"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_unauthorized() {
        let state = state();
        let mut ghost = create_user(&state, "op@armazem.test", UserRole::Operador).await;
        ghost.id = 999;
        let (token, _) = state.jwt_manager.generate_token(&ghost).unwrap();

        let response = call(app(state), "/api/whoami", Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_malformed_header() {
        let response = call(app(state()), "/api/whoami", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(app(state()), "/api/whoami", Some("Token abc")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejects_token_from_other_secret() {
        let state = state();
        let user = create_user(&state, "op@armazem.test", UserRole::Operador).await;
        let other = JwtManager::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let (token, _) = other.generate_token(&user).unwrap();

        let response = call(app(state), "/api/whoami", Some(&format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
