//! PostgreSQL 仓储集成测试
//!
//! 产品提交依赖事务、部分唯一索引和条件更新，内存实现无法完全覆盖，
//! 因此需要连真实数据库验证。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test --test postgres_repository_test -- --ignored
//! ```

use chrono::Utc;
use inventory::models::{
    Actor, ChamberDimensions, ChamberStatus, LocationFilter, NewChamber, NewClient, PageRequest,
    ProductStatus, StorageType, UserRole, WithdrawalStatus,
};
use inventory::service::{CreateProduct, CreateUser, LockoutPolicy};
use inventory::repository::LocationRepositoryTrait;
use inventory::service::password::MIN_COST;
use inventory::{
    ChamberService, ClientService, InventoryError, LocationService, ProductService, Repositories,
    UserService, WithdrawalService,
};
use sqlx::PgPool;
use storage_shared::config::DatabaseConfig;
use storage_shared::database::Database;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup() -> (PgPool, Repositories) {
    let config = DatabaseConfig {
        url: database_url(),
        max_connections: 4,
        min_connections: 1,
        ..Default::default()
    };
    let db = Database::connect(&config).await.expect("数据库连接失败");
    db.run_migrations().await.expect("执行迁移失败");
    let pool = db.pool().clone();
    (pool.clone(), Repositories::postgres(pool))
}

/// 每个测试用唯一后缀，避免与其他数据冲突
fn unique_suffix() -> String {
    Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string()
}

/// 按后缀生成合法的 14 位 CNPJ
fn unique_document(suffix: &str) -> String {
    let digits: String = suffix.chars().rev().take(14).collect();
    format!("{:0>14}", digits)
}

async fn seed_user(repos: &Repositories, suffix: &str, role: UserRole) -> Actor {
    let users = UserService::new(repos, LockoutPolicy::default()).with_password_cost(MIN_COST);
    let user = users
        .create(CreateUser {
            name: format!("Teste {}", suffix),
            email: format!("teste-{}-{}@armazem.com", role, suffix).to_lowercase(),
            password: "armazem2026".to_string(),
            role,
        })
        .await
        .expect("创建用户失败");
    Actor::new(user.id, role)
}

// ==================== 测试用例 ====================

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_full_withdrawal_against_postgres() {
    let (_pool, repos) = setup().await;
    let suffix = unique_suffix();
    let operator = seed_user(&repos, &suffix, UserRole::Operador).await;
    let admin = seed_user(&repos, &suffix, UserRole::Admin).await;

    let chamber = ChamberService::new(&repos)
        .create(NewChamber {
            name: format!("Câmara {}", suffix),
            description: None,
            temperature_target: Some(10.0),
            humidity_target: Some(40.0),
            dimensions: ChamberDimensions::new(1, 1, 2, 2),
            status: ChamberStatus::Active,
        })
        .await
        .unwrap();
    let locations = LocationService::new(&repos);
    assert_eq!(
        locations.generate_for_chamber(chamber.id, 1000.0).await.unwrap(),
        4
    );
    let slots = locations
        .list(&LocationFilter {
            chamber_id: Some(chamber.id),
            ..Default::default()
        })
        .await
        .unwrap();

    let client = ClientService::new(&repos)
        .create(NewClient {
            name: format!("Cliente {}", suffix),
            document: unique_document(&suffix),
            email: None,
            phone: None,
            address: None,
            contact_person: None,
        })
        .await
        .unwrap();

    let products = ProductService::new(&repos);
    let product = products
        .create(
            CreateProduct {
                name: "Milho AG 1051".to_string(),
                lot: format!("L-{}", suffix),
                seed_type: Some("MILHO".to_string()),
                quantity: 10,
                unit_weight_kg: 20.0,
                storage_type: StorageType::BigBag,
                client_id: client.id,
                location_id: Some(slots[0].id),
                expiration_date: None,
                notes: None,
            },
            operator,
        )
        .await
        .unwrap();
    assert_eq!(product.status, ProductStatus::Locado);
    assert_eq!(product.version, 1);

    // 同一库位第二个产品被部分唯一索引拦截
    let err = products
        .create(
            CreateProduct {
                name: "Milho AG 1051".to_string(),
                lot: format!("L2-{}", suffix),
                seed_type: None,
                quantity: 1,
                unit_weight_kg: 20.0,
                storage_type: StorageType::Bag,
                client_id: client.id,
                location_id: Some(slots[0].id),
                expiration_date: None,
                notes: None,
            },
            operator,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::LocationOccupied(_)));

    let withdrawals = WithdrawalService::new(&repos);
    let request = withdrawals
        .request(product.id, None, "Expedição".to_string(), Some(1), operator)
        .await
        .unwrap();
    let approved = withdrawals.approve(request.id, None, admin).await.unwrap();
    assert_eq!(approved.status, WithdrawalStatus::Approved);

    let product = products.get(product.id).await.unwrap();
    assert_eq!(product.status, ProductStatus::Retirado);
    assert_eq!(product.version, 3);
    assert!(!locations.get(slots[0].id).await.unwrap().occupied);

    let history = products
        .history(product.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_stale_deactivation_of_occupied_location() {
    let (_pool, repos) = setup().await;
    let suffix = unique_suffix();
    let operator = seed_user(&repos, &suffix, UserRole::Operador).await;

    let chamber = ChamberService::new(&repos)
        .create(NewChamber {
            name: format!("Câmara {}", suffix),
            description: None,
            temperature_target: None,
            humidity_target: None,
            dimensions: ChamberDimensions::new(1, 1, 1, 1),
            status: ChamberStatus::Active,
        })
        .await
        .unwrap();
    let locations = LocationService::new(&repos);
    locations.generate_for_chamber(chamber.id, 1000.0).await.unwrap();
    let mut stale = locations
        .list(&LocationFilter {
            chamber_id: Some(chamber.id),
            ..Default::default()
        })
        .await
        .unwrap()
        .remove(0);

    let client = ClientService::new(&repos)
        .create(NewClient {
            name: format!("Cliente {}", suffix),
            document: unique_document(&suffix),
            email: None,
            phone: None,
            address: None,
            contact_person: None,
        })
        .await
        .unwrap();
    ProductService::new(&repos)
        .create(
            CreateProduct {
                name: "Soja".to_string(),
                lot: format!("L-{}", suffix),
                seed_type: None,
                quantity: 5,
                unit_weight_kg: 20.0,
                storage_type: StorageType::Bag,
                client_id: client.id,
                location_id: Some(stale.id),
                expiration_date: None,
                notes: None,
            },
            operator,
        )
        .await
        .unwrap();

    // 快照读取于上架之前，仓储层的条件更新仍要拦下
    stale.active = false;
    let err = repos.locations.update(&stale).await.unwrap_err();
    assert!(matches!(err, InventoryError::LocationOccupied(id) if id == stale.id));
    assert!(locations.get(stale.id).await.unwrap().active);
}
