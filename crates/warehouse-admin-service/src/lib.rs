//! 冷库仓储管理后台服务
//!
//! 提供冷库、库位、客户、产品、出库申请和用户管理的 REST API。
//!
//! ## 核心功能
//!
//! - **认证**：邮箱密码登录，签发 JWT，连续失败锁定账号
//! - **基础数据**：冷库、库位（含批量生成）、客户、用户
//! - **产品流转**：登记、上架、移库、作废、移除，以及出库申请与审批
//! - **查询**：流水记录、首页统计
//!
//! ## 模块结构
//!
//! - `auth`: JWT 签发与校验
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型与 HTTP 映射
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证与角色中间件
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use dto::{ApiResponse, PageResponse};
pub use error::{ApiError, Result};
pub use state::AppState;
