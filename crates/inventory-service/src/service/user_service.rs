//! 用户服务
//!
//! 账号维护、登录校验（失败计数与锁定）、修改密码

use std::sync::Arc;

use chrono::{Duration, Utc};
use storage_shared::config::AuthConfig;
use storage_shared::observability::metrics;
use tracing::{info, instrument, warn};

use super::password::{check_password_strength, hash_password, verify_password, DEFAULT_COST};
use super::product_service::required_text;
use crate::error::{InventoryError, Result};
use crate::models::{
    Actor, LoginState, NewUser, PageRequest, Paged, User, UserFilter, UserRole,
};
use crate::repository::{Repositories, UserRepositoryTrait};
use crate::service::dto::{CreateUser, UserPatch};

/// 登录锁定策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i32,
    pub lockout_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_minutes: 30,
        }
    }
}

impl From<&AuthConfig> for LockoutPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_logins.max(1),
            lockout_minutes: config.lockout_minutes.max(1),
        }
    }
}

/// 用户服务
pub struct UserService {
    users: Arc<dyn UserRepositoryTrait>,
    policy: LockoutPolicy,
    password_cost: u32,
}

impl UserService {
    pub fn new(repos: &Repositories, policy: LockoutPolicy) -> Self {
        Self {
            users: repos.users.clone(),
            policy,
            password_cost: DEFAULT_COST,
        }
    }

    /// 调整 bcrypt cost，测试中使用 MIN_COST 加快速度
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create(&self, input: CreateUser) -> Result<User> {
        check_password_strength(&input.password)?;
        let new_user = NewUser {
            name: required_text(&input.name, "姓名")?,
            email: normalize_email(&input.email)?,
            password_hash: hash_password(&input.password, self.password_cost)?,
            role: input.role,
        };

        let user = self.users.create(&new_user).await?;
        info!(user_id = user.id, "用户已创建");
        Ok(user)
    }

    /// 修改用户
    ///
    /// 不能停用自己；最后一个启用的管理员不能降级或停用
    #[instrument(skip(self, patch), fields(actor = actor.user_id))]
    pub async fn update(&self, id: i64, patch: UserPatch, actor: Actor) -> Result<User> {
        let mut user = self.load(id).await?;

        if patch.active == Some(false) && id == actor.user_id {
            return Err(InventoryError::Forbidden("不能停用自己的账号".to_string()));
        }

        let loses_admin = user.role == UserRole::Admin
            && user.active
            && (patch.role.is_some_and(|r| r != UserRole::Admin) || patch.active == Some(false));
        if loses_admin {
            self.ensure_not_last_admin().await?;
        }

        if let Some(name) = &patch.name {
            user.name = required_text(name, "姓名")?;
        }
        if let Some(email) = &patch.email {
            user.email = normalize_email(email)?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        if let Some(password) = &patch.password {
            check_password_strength(password)?;
            user.password_hash = hash_password(password, self.password_cost)?;
            user.failed_login_attempts = 0;
            user.locked_until = None;
        }

        let updated = self.users.update(&user).await?;
        info!(user_id = id, "用户已更新");
        Ok(updated)
    }

    /// 删除用户，有操作记录的用户改为停用
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn delete(&self, id: i64, actor: Actor) -> Result<()> {
        if id == actor.user_id {
            return Err(InventoryError::Forbidden("不能删除自己的账号".to_string()));
        }
        let user = self.load(id).await?;
        if user.role == UserRole::Admin && user.active {
            self.ensure_not_last_admin().await?;
        }

        self.users.delete(id).await?;
        warn!(user_id = id, "用户已删除");
        Ok(())
    }

    /// 登录校验
    ///
    /// 连续失败达到上限后锁定；成功后清零失败次数并记录登录时间
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let result = self.check_credentials(email, password).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(InventoryError::UserLocked(_)) => "locked",
            Err(InventoryError::UserDisabled) => "disabled",
            Err(InventoryError::InvalidCredentials) => "invalid",
            Err(_) => "error",
        };
        metrics::record_login_attempt(outcome);
        result
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(InventoryError::InvalidCredentials)?;

        if !user.active {
            return Err(InventoryError::UserDisabled);
        }

        let now = Utc::now();
        if let Some(until) = user.locked_until.filter(|until| *until > now) {
            let minutes = (until - now).num_minutes() + 1;
            return Err(InventoryError::UserLocked(minutes));
        }

        if !verify_password(password, &user.password_hash)? {
            let attempts = user.failed_login_attempts + 1;
            let locked_until = (attempts >= self.policy.max_failed_attempts)
                .then(|| now + Duration::minutes(self.policy.lockout_minutes));
            // 锁定后计数归零，解锁后重新计算
            let state = LoginState {
                failed_login_attempts: if locked_until.is_some() { 0 } else { attempts },
                locked_until,
                last_login_at: None,
            };
            self.users.record_login(user.id, &state).await?;

            if locked_until.is_some() {
                warn!(user_id = user.id, attempts, "连续登录失败，账号已锁定");
                return Err(InventoryError::UserLocked(self.policy.lockout_minutes));
            }
            return Err(InventoryError::InvalidCredentials);
        }

        let state = LoginState {
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: Some(now),
        };
        self.users.record_login(user.id, &state).await?;
        user.failed_login_attempts = 0;
        user.locked_until = None;
        user.last_login_at = Some(now);

        info!(user_id = user.id, "登录成功");
        Ok(user)
    }

    /// 修改自己的密码，需要校验旧密码
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut user = self.load(id).await?;
        if !verify_password(old_password, &user.password_hash)? {
            return Err(InventoryError::InvalidCredentials);
        }
        check_password_strength(new_password)?;
        if old_password == new_password {
            return Err(InventoryError::Validation("新密码不能与旧密码相同".to_string()));
        }

        user.password_hash = hash_password(new_password, self.password_cost)?;
        self.users.update(&user).await?;
        info!(user_id = id, "密码已修改");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.load(id).await
    }

    pub async fn list(&self, filter: UserFilter, page: PageRequest) -> Result<Paged<User>> {
        self.users.list(&filter, page).await
    }

    /// 初始化管理员账号，邮箱已存在时不做任何事
    pub async fn bootstrap_admin(&self, name: &str, email: &str, password: &str) -> Result<Option<User>> {
        let email = normalize_email(email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        let admin = self
            .create(CreateUser {
                name: name.to_string(),
                email,
                password: password.to_string(),
                role: UserRole::Admin,
            })
            .await?;
        info!(user_id = admin.id, "已初始化管理员账号");
        Ok(Some(admin))
    }

    async fn ensure_not_last_admin(&self) -> Result<()> {
        if self.users.count_active_admins().await? <= 1 {
            return Err(InventoryError::LastAdmin);
        }
        Ok(())
    }

    async fn load(&self, id: i64) -> Result<User> {
        self.users
            .get(id)
            .await?
            .ok_or(InventoryError::UserNotFound(id))
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(InventoryError::Validation(format!("邮箱格式不正确: {}", email)));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::password::MIN_COST;

    fn service() -> UserService {
        UserService::new(&Repositories::in_memory(), LockoutPolicy::default())
            .with_password_cost(MIN_COST)
    }

    fn admin_input(email: &str) -> CreateUser {
        CreateUser {
            name: "Maria Souza".to_string(),
            email: email.to_string(),
            password: "armazem2026".to_string(),
            role: UserRole::Admin,
        }
    }

    #[tokio::test]
    async fn test_lockout_after_max_failures() {
        let service = service();
        service.create(admin_input("Maria@Armazem.com")).await.unwrap();

        for _ in 0..4 {
            let err = service
                .authenticate("maria@armazem.com", "errada123")
                .await
                .unwrap_err();
            assert!(matches!(err, InventoryError::InvalidCredentials));
        }
        let err = service
            .authenticate("maria@armazem.com", "errada123")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::UserLocked(30)));

        // 锁定期内正确密码也被拒绝
        let err = service
            .authenticate("maria@armazem.com", "armazem2026")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::UserLocked(_)));
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let service = service();
        let user = service.create(admin_input("joao@armazem.com")).await.unwrap();

        service
            .authenticate("joao@armazem.com", "errada123")
            .await
            .unwrap_err();
        let logged = service
            .authenticate(" JOAO@armazem.com ", "armazem2026")
            .await
            .unwrap();
        assert_eq!(logged.failed_login_attempts, 0);
        assert!(logged.last_login_at.is_some());

        let stored = service.get(user.id).await.unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
    }

    #[tokio::test]
    async fn test_disabled_user_cannot_login() {
        let service = service();
        let admin = service.create(admin_input("admin@armazem.com")).await.unwrap();
        let mut operator = admin_input("op@armazem.com");
        operator.role = UserRole::Operador;
        let operator = service.create(operator).await.unwrap();

        service
            .update(
                operator.id,
                UserPatch {
                    active: Some(false),
                    ..Default::default()
                },
                Actor::new(admin.id, UserRole::Admin),
            )
            .await
            .unwrap();

        let err = service
            .authenticate("op@armazem.com", "armazem2026")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::UserDisabled));
    }

    #[tokio::test]
    async fn test_last_admin_is_protected() {
        let service = service();
        let admin = service.create(admin_input("admin@armazem.com")).await.unwrap();
        let mut other = admin_input("outro@armazem.com");
        other.role = UserRole::Operador;
        let other = service.create(other).await.unwrap();

        let err = service
            .update(
                admin.id,
                UserPatch {
                    role: Some(UserRole::Operador),
                    ..Default::default()
                },
                Actor::new(other.id, UserRole::Admin),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::LastAdmin));

        let err = service
            .delete(admin.id, Actor::new(other.id, UserRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::LastAdmin));

        let err = service
            .delete(admin.id, Actor::new(admin.id, UserRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_change_password_requires_old_password() {
        let service = service();
        let user = service.create(admin_input("ana@armazem.com")).await.unwrap();

        let err = service
            .change_password(user.id, "errada123", "novaSenha42")
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidCredentials));

        service
            .change_password(user.id, "armazem2026", "novaSenha42")
            .await
            .unwrap();
        assert!(service.authenticate("ana@armazem.com", "novaSenha42").await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let service = service();
        let first = service
            .bootstrap_admin("Administrador", "admin@armazem.com", "armazem2026")
            .await
            .unwrap();
        assert!(first.is_some());

        let second = service
            .bootstrap_admin("Administrador", "ADMIN@armazem.com", "armazem2026")
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_policy_from_config() {
        let config = AuthConfig {
            max_failed_logins: 3,
            lockout_minutes: 10,
            ..Default::default()
        };
        let policy = LockoutPolicy::from(&config);
        assert_eq!(policy.max_failed_attempts, 3);
        assert_eq!(policy.lockout_minutes, 10);
    }
}
