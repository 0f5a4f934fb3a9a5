//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 产品相关的多表写入统一走 `ProductRepositoryTrait::commit`，在一个事务内完成
//! - 定义 trait 接口以支持 mock 测试，并提供内存实现用于本地开发

mod chamber_repo;
mod client_repo;
mod location_repo;
mod memory;
mod movement_repo;
mod product_repo;
mod traits;
mod user_repo;
mod withdrawal_repo;

pub use chamber_repo::ChamberRepository;
pub use client_repo::ClientRepository;
pub use location_repo::LocationRepository;
pub use memory::MemoryStore;
pub use movement_repo::MovementRepository;
pub use product_repo::ProductRepository;
pub use traits::*;
pub use user_repo::UserRepository;
pub use withdrawal_repo::WithdrawalRepository;

use sqlx::PgPool;
use std::sync::Arc;

/// 服务层使用的全部仓储
#[derive(Clone)]
pub struct Repositories {
    pub chambers: Arc<dyn ChamberRepositoryTrait>,
    pub locations: Arc<dyn LocationRepositoryTrait>,
    pub clients: Arc<dyn ClientRepositoryTrait>,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub products: Arc<dyn ProductRepositoryTrait>,
    pub movements: Arc<dyn MovementRepositoryTrait>,
    pub withdrawals: Arc<dyn WithdrawalRepositoryTrait>,
}

impl Repositories {
    /// PostgreSQL 实现
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            chambers: Arc::new(ChamberRepository::new(pool.clone())),
            locations: Arc::new(LocationRepository::new(pool.clone())),
            clients: Arc::new(ClientRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            movements: Arc::new(MovementRepository::new(pool.clone())),
            withdrawals: Arc::new(WithdrawalRepository::new(pool)),
        }
    }

    /// 内存实现，所有仓储共享同一个存储
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            chambers: store.clone(),
            locations: store.clone(),
            clients: store.clone(),
            users: store.clone(),
            products: store.clone(),
            movements: store.clone(),
            withdrawals: store,
        }
    }
}

/// 唯一约束冲突时返回约束名
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .filter(|e| e.is_unique_violation())
        .map(|e| e.constraint().unwrap_or_default().to_string())
}

/// 模糊查询参数，空白关键字视为不过滤
pub(crate) fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("%{}%", k.replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(Some("soja")), Some("%soja%".to_string()));
        assert_eq!(like_pattern(Some("50%")), Some("%50\\%%".to_string()));
    }
}
