//! 冷库仓储管理后台服务
//!
//! 提供冷库、库位、客户、产品流转、出库审批等 REST API。

use std::time::Duration;

use axum::{
    Json,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use inventory::{LockoutPolicy, Repositories, UserService};
use storage_shared::{
    config::{AppConfig, AuthConfig, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{info, warn};
use warehouse_admin::{
    auth::{JwtConfig, JwtManager},
    routes,
    state::AppState,
};

const SERVICE_NAME: &str = "warehouse-admin-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        backend = ?config.storage_backend,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    // 生产环境禁止使用默认 JWT 密钥
    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        if config.is_production() {
            anyhow::bail!("生产环境必须通过 WAREHOUSE_AUTH__JWT_SECRET 设置 JWT 密钥");
        }
        warn!("使用默认 JWT 密钥，生产环境请设置 WAREHOUSE_AUTH__JWT_SECRET");
    }

    let (repos, db) = match config.storage_backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations().await?;
            }
            (Repositories::postgres(db.pool().clone()), Some(db))
        }
        StorageBackend::Memory => {
            warn!("使用内存存储，服务重启后数据将丢失");
            (Repositories::in_memory(), None)
        }
    };

    let users = UserService::new(&repos, LockoutPolicy::from(&config.auth));
    bootstrap_admin(&users).await?;

    let jwt_manager = JwtManager::new(JwtConfig::from(&config.auth));
    let state = AppState::new(&repos, users, jwt_manager);

    let db_for_ready = db.clone();
    let app = routes::app(state)
        .route(
            "/ready",
            get(move || readiness_check(db_for_ready.clone())),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_seconds),
        ))
        .layer(cors_layer(&config));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 收到 SIGTERM 或 Ctrl+C 后停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = db {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

/// 首次部署时根据环境变量创建管理员账号
///
/// 已存在管理员时不做任何操作
async fn bootstrap_admin(users: &UserService) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("WAREHOUSE_ADMIN_EMAIL"),
        std::env::var("WAREHOUSE_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };
    let name = std::env::var("WAREHOUSE_ADMIN_NAME").unwrap_or_else(|_| "Administrador".to_string());

    if let Some(admin) = users.bootstrap_admin(&name, &email, &password).await? {
        info!(user_id = admin.id, email = %admin.email, "已创建初始管理员");
    }
    Ok(())
}

/// CORS 配置，"*" 放行所有来源
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config.server.cors_origins.trim();

    if allowed_origins == "*" {
        if config.is_production() {
            warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));
    response
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("注册 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("注册 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 就绪探针：使用 PostgreSQL 时检查数据库连接
async fn readiness_check(db: Option<Database>) -> Json<serde_json::Value> {
    let database = match &db {
        Some(db) if db.health_check().await.is_ok() => "ok",
        Some(_) => "fail",
        None => "memory",
    };
    let ready = database != "fail";

    Json(serde_json::json!({
        "status": if ready { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": database
        },
        "pool": db.as_ref().map(Database::pool_status)
    }))
}
