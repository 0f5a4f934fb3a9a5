//! 中间件模块
//!
//! 提供认证和角色检查中间件

mod auth;
mod role;

pub use auth::auth_middleware;
pub use role::require_role;
