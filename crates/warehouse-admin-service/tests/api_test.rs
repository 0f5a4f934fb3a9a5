//! REST API 集成测试
//!
//! 基于内存存储构建完整路由，通过 oneshot 驱动请求，覆盖认证、角色和产品流转。

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use fake::Fake;
use fake::faker::company::en::CompanyName;
use inventory::{LockoutPolicy, Repositories, UserService};
use serde_json::{Value, json};
use tower::ServiceExt;
use warehouse_admin::{
    auth::{JwtConfig, JwtManager},
    routes,
    state::AppState,
};

const ADMIN_EMAIL: &str = "admin@armazem.test";
const ADMIN_PASSWORD: &str = "Admin12345";

/// bcrypt 最低 cost，加快测试
const TEST_BCRYPT_COST: u32 = 4;

async fn test_app() -> Router {
    let repos = Repositories::in_memory();
    let users =
        UserService::new(&repos, LockoutPolicy::default()).with_password_cost(TEST_BCRYPT_COST);
    let state = AppState::new(&repos, users, JwtManager::new(JwtConfig::default()));

    state
        .users
        .bootstrap_admin("Administrador", ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();

    routes::app(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_operator(app: &Router, admin_token: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/users",
        Some(admin_token),
        Some(json!({
            "name": "Operador",
            "email": "operador@armazem.test",
            "password": "Operador123",
            "role": "OPERADOR"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(app, "operador@armazem.test", "Operador123").await
}

/// 管理员建冷库并生成库位，返回冷库 ID
async fn setup_chamber(app: &Router, admin_token: &str, levels: i32) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/chambers",
        Some(admin_token),
        Some(json!({
            "name": "Camara 01",
            "blocks": 1,
            "sides": 1,
            "rows": 1,
            "levels": levels
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let chamber_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        &format!("/api/chambers/{}/locations/generate", chamber_id),
        Some(admin_token),
        Some(json!({ "maxCapacityKg": 1000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["created"], levels);

    chamber_id
}

async fn create_client(app: &Router, token: &str) -> i64 {
    let name: String = CompanyName().fake();
    let (status, body) = send(
        app,
        "POST",
        "/api/clients",
        Some(token),
        Some(json!({ "name": name, "document": "12.345.678/0001-95" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app().await;

    let (status, body) = send(&app, "GET", "/api/products", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, "GET", "/api/products", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_current_user() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "ADMIN");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_operator_cannot_use_admin_routes() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let operator = create_operator(&app, &admin).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/chambers",
        Some(&operator),
        Some(json!({ "name": "C", "blocks": 1, "sides": 1, "rows": 1, "levels": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = send(&app, "GET", "/api/users", Some(&operator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 查询接口对操作员开放
    let (status, body) = send(&app, "GET", "/api/chambers", Some(&operator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_old_token_follows_stored_role_and_status() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin),
        Some(json!({
            "name": "Chefe",
            "email": "chefe@armazem.test",
            "password": "Chefe12345",
            "role": "ADMIN"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let chefe_id = body["data"]["id"].as_i64().unwrap();
    let chefe = login(&app, "chefe@armazem.test", "Chefe12345").await;

    // 仅降级：旧 Token 立即失去管理员权限
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", chefe_id),
        Some(&admin),
        Some(json!({ "role": "OPERADOR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/chambers",
        Some(&chefe),
        Some(json!({ "name": "C", "blocks": 1, "sides": 1, "rows": 1, "levels": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&chefe), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "OPERADOR");

    // 停用后任何认证接口都拒绝
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}", chefe_id),
        Some(&admin),
        Some(json!({ "role": "OPERADOR", "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/chambers",
        Some(&chefe),
        Some(json!({ "name": "C", "blocks": 1, "sides": 1, "rows": 1, "levels": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_DISABLED");

    let (status, body) = send(&app, "GET", "/api/users", Some(&chefe), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_DISABLED");

    let (status, _) = send(&app, "GET", "/api/chambers", Some(&chefe), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_huge_page_returns_empty_list() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/products?page=9223372036854775807",
        Some(&admin),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_product_withdrawal_flow_over_http() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let operator = create_operator(&app, &admin).await;
    let chamber_id = setup_chamber(&app, &admin, 2).await;
    let client_id = create_client(&app, &operator).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(&operator),
        Some(json!({
            "name": "Soja RR",
            "lot": "L-2024-001",
            "quantity": 10,
            "unitWeightKg": 40.0,
            "clientId": client_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "CADASTRADO");
    assert_eq!(body["data"]["totalWeightKg"], 400.0);
    let product_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/products/{}/submit", product_id),
        Some(&operator),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "AGUARDANDO_LOCACAO");

    let (status, body) = send(
        &app,
        "GET",
        &format!(
            "/api/locations/available?chamberId={}&weightKg=400",
            chamber_id
        ),
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let locations = body["data"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
    let location_id = locations[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/products/{}/allocate", product_id),
        Some(&operator),
        Some(json!({ "locationId": location_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "LOCADO");
    assert_eq!(body["data"]["locationId"], location_id);

    let (status, body) = send(
        &app,
        "POST",
        "/api/withdrawals",
        Some(&operator),
        Some(json!({ "productId": product_id, "reason": "Entrega ao cliente" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "PENDING");
    let withdrawal_id = body["data"]["id"].as_i64().unwrap();

    let approve_uri = format!("/api/withdrawals/{}/approve", withdrawal_id);
    let (status, _) = send(&app, "POST", &approve_uri, Some(&operator), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &approve_uri,
        Some(&admin),
        Some(json!({ "note": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "APPROVED");

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/products/{}", product_id),
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(body["data"]["status"], "RETIRADO");
    assert!(body["data"]["locationId"].is_null());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/products/{}/history", product_id),
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["items"][0]["movementType"], "EXIT");

    // 库位已释放
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/locations/{}", location_id),
        Some(&operator),
        None,
    )
    .await;
    assert_eq!(body["data"]["occupied"], false);
}

#[tokio::test]
async fn test_error_envelope() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let chamber_id = setup_chamber(&app, &admin, 1).await;
    let client_id = create_client(&app, &admin).await;

    let (status, body) = send(&app, "GET", "/api/products/9999", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
    assert!(body["data"].is_null());

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(&admin),
        Some(json!({
            "name": "Milho",
            "lot": "L1",
            "quantity": 0,
            "unitWeightKg": 20.0,
            "clientId": client_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // 2000kg 超过库位承重
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/locations?chamberId={}", chamber_id),
        Some(&admin),
        None,
    )
    .await;
    let location_id = body["data"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(&admin),
        Some(json!({
            "name": "Milho",
            "lot": "L2",
            "quantity": 50,
            "unitWeightKg": 40.0,
            "clientId": client_id,
            "locationId": location_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");
}
