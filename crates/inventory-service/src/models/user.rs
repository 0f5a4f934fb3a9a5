//! 系统用户模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserRole;

/// 系统用户
///
/// password_hash 不参与序列化，避免通过 API 泄露
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 账号当前是否处于锁定期
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// 新建用户（密码已哈希）
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// 登录状态更新
#[derive(Debug, Clone, PartialEq)]
pub struct LoginState {
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// 用户查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub keyword: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let keyword_ok = self.keyword.as_deref().is_none_or(|k| {
            let k = k.to_lowercase();
            user.name.to_lowercase().contains(&k) || user.email.to_lowercase().contains(&k)
        });
        keyword_ok
            && self.role.is_none_or(|r| user.role == r)
            && self.active.is_none_or(|a| user.active == a)
    }
}
