//! 冷库种子仓储核心服务
//!
//! 管理冷库（câmara）、库位、客户、用户、产品以及出库申请。
//!
//! ## 核心功能
//!
//! - **产品生命周期**：CADASTRADO → AGUARDANDO_LOCACAO → LOCADO → AGUARDANDO_RETIRADA →
//!   RETIRADO / REMOVIDO / CANCELADO，状态流转受角色约束
//! - **库位容量校验**：一个库位只能存放一个产品，重量不得超过库位承重，坐标必须落在冷库尺寸内
//! - **流水记录**：入库、移库、出库、调整和状态变更都会自动生成流水，作为审计依据
//! - **乐观锁**：产品写入必须携带期望版本号，版本不一致时拒绝写入
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `lifecycle`: 产品状态机
//! - `error`: 错误类型定义
//! - `repository`: 仓储接口与 PostgreSQL / 内存实现
//! - `service`: 业务服务层

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{InventoryError, Result};
pub use lifecycle::ProductAction;
pub use models::*;
pub use repository::Repositories;
pub use service::{
    ChamberService, ClientService, LocationService, LockoutPolicy, MovementService,
    ProductService, StatsService, UserService, WithdrawalService,
};
