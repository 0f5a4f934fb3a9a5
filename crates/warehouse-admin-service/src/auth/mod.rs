//! 认证模块
//!
//! 提供 JWT Token 生成和验证；密码哈希在服务层完成

mod jwt;

pub use jwt::{Claims, JwtConfig, JwtManager};
