//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use inventory::{
    ChamberService, ClientService, LocationService, MovementService, ProductService,
    Repositories, StatsService, UserService, WithdrawalService,
};

use crate::auth::JwtManager;

/// Axum 应用共享状态
///
/// 各业务服务通过 Arc 在 handler 间共享，底层仓储由启动时选择的存储后端决定
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ProductService>,
    pub withdrawals: Arc<WithdrawalService>,
    pub locations: Arc<LocationService>,
    pub chambers: Arc<ChamberService>,
    pub clients: Arc<ClientService>,
    pub users: Arc<UserService>,
    pub movements: Arc<MovementService>,
    pub stats: Arc<StatsService>,
    pub jwt_manager: Arc<JwtManager>,
}

impl AppState {
    /// 创建新的应用状态
    ///
    /// UserService 由调用方构造，以便注入登录锁定策略和 bcrypt cost
    pub fn new(repos: &Repositories, users: UserService, jwt_manager: JwtManager) -> Self {
        Self {
            products: Arc::new(ProductService::new(repos)),
            withdrawals: Arc::new(WithdrawalService::new(repos)),
            locations: Arc::new(LocationService::new(repos)),
            chambers: Arc::new(ChamberService::new(repos)),
            clients: Arc::new(ClientService::new(repos)),
            users: Arc::new(users),
            movements: Arc::new(MovementService::new(repos)),
            stats: Arc::new(StatsService::new(repos)),
            jwt_manager: Arc::new(jwt_manager),
        }
    }
}
