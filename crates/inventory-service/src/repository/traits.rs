//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Chamber, ChamberDimensions, Client, ClientFilter, CommitResult, Location, LocationFilter,
    LoginState, Movement, MovementFilter, NewChamber, NewClient, NewLocation, NewUser, PageRequest,
    Paged, Product, ProductCommit, ProductFilter, ProductStatus, User, UserFilter,
    WithdrawalFilter, WithdrawalRequest,
};

/// 单个冷库的库位汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct LocationStats {
    pub total_locations: i64,
    pub active_locations: i64,
    pub occupied_locations: i64,
    pub stored_weight_kg: f64,
    pub capacity_kg: f64,
}

/// 冷库仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChamberRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Chamber>>;
    async fn list(&self) -> Result<Vec<Chamber>>;
    async fn create(&self, chamber: &NewChamber) -> Result<Chamber>;
    async fn update(&self, chamber: &Chamber) -> Result<Chamber>;
    /// 删除冷库及其空闲库位，存在占用库位时返回 ChamberInUse
    async fn delete(&self, id: i64) -> Result<()>;
}

/// 库位仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Location>>;
    async fn list(&self, filter: &LocationFilter) -> Result<Vec<Location>>;
    async fn create(&self, location: &NewLocation) -> Result<Location>;
    /// 批量创建，已存在的坐标跳过，返回实际新建数量
    async fn create_many(&self, locations: &[NewLocation]) -> Result<u64>;
    /// 更新承重和启用状态
    async fn update(&self, location: &Location) -> Result<Location>;
    /// 删除空闲库位，已占用时返回 LocationOccupied
    async fn delete(&self, id: i64) -> Result<()>;
    async fn stats(&self, chamber_id: i64) -> Result<LocationStats>;
    /// 统计落在给定尺寸之外的库位数量
    async fn count_outside(&self, chamber_id: i64, dimensions: ChamberDimensions) -> Result<i64>;
}

/// 客户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Client>>;
    async fn find_by_document(&self, document: &str) -> Result<Option<Client>>;
    async fn list(&self, filter: &ClientFilter, page: PageRequest) -> Result<Paged<Client>>;
    async fn create(&self, client: &NewClient) -> Result<Client>;
    async fn update(&self, client: &Client) -> Result<Client>;
    /// 无历史产品时物理删除，否则仅停用
    async fn delete(&self, id: i64) -> Result<()>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Paged<User>>;
    async fn create(&self, user: &NewUser) -> Result<User>;
    /// 更新资料、角色、启用状态和密码哈希
    async fn update(&self, user: &User) -> Result<User>;
    async fn record_login(&self, id: i64, state: &LoginState) -> Result<()>;
    /// 没有操作记录时物理删除，否则仅停用
    async fn delete(&self, id: i64) -> Result<()>;
    async fn count_active_admins(&self) -> Result<i64>;
}

/// 产品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Product>>;
    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>>;
    /// 原子提交产品、库位、流水和出库申请的变化
    async fn commit(&self, commit: ProductCommit) -> Result<CommitResult>;
    async fn count_by_status(&self) -> Result<Vec<(ProductStatus, i64)>>;
    /// 客户名下非终态产品数量
    async fn count_active_by_client(&self, client_id: i64) -> Result<i64>;
}

/// 流水仓储接口（只读，写入走产品提交）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovementRepositoryTrait: Send + Sync {
    /// 按时间倒序
    async fn list(&self, filter: &MovementFilter, page: PageRequest) -> Result<Paged<Movement>>;
    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64>;
}

/// 出库申请仓储接口（只读，写入走产品提交）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WithdrawalRepositoryTrait: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<WithdrawalRequest>>;
    async fn list(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<Paged<WithdrawalRequest>>;
    async fn find_pending_by_product(&self, product_id: i64) -> Result<Option<WithdrawalRequest>>;
}
