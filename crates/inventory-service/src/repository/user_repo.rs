//! 用户仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserRepositoryTrait;
use super::{like_pattern, unique_violation};
use crate::error::{InventoryError, Result};
use crate::models::{LoginState, NewUser, PageRequest, Paged, User, UserFilter, UserRole};

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, role, active, failed_login_attempts,
    locked_until, last_login_at, created_at, updated_at
"#;

/// 用户仓储
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Paged<User>> {
        let keyword = like_pattern(filter.keyword.as_deref());

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::varchar IS NULL OR role = $2)
              AND ($3::boolean IS NULL OR active = $3)
            "#,
        )
        .bind(&keyword)
        .bind(filter.role)
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Paged::new(vec![], 0));
        }

        let items = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::varchar IS NULL OR role = $2)
              AND ($3::boolean IS NULL OR active = $3)
            ORDER BY name ASC, id ASC
            LIMIT $4 OFFSET $5
            "#,
            USER_COLUMNS
        ))
        .bind(&keyword)
        .bind(filter.role)
        .bind(filter.active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged::new(items, total))
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW(), NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateEmail(user.email.clone()),
            None => e.into(),
        })?;

        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, role = $5, active = $6,
                failed_login_attempts = $7, locked_until = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.active)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateEmail(user.email.clone()),
            None => e.into(),
        })?;

        updated.ok_or(InventoryError::UserNotFound(user.id))
    }

    async fn record_login(&self, id: i64, state: &LoginState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = $2,
                locked_until = $3,
                last_login_at = COALESCE($4, last_login_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.failed_login_attempts)
        .bind(state.locked_until)
        .bind(state.last_login_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let (references,): (i64,) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM products WHERE created_by = $1)
                 + (SELECT COUNT(*) FROM movements WHERE user_id = $1)
                 + (SELECT COUNT(*) FROM withdrawal_requests
                    WHERE requested_by = $1 OR decided_by = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        // 留有操作记录的用户只停用
        let result = if references > 0 {
            sqlx::query("UPDATE users SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
        } else {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(InventoryError::UserNotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count_active_admins(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1 AND active = TRUE")
                .bind(UserRole::Admin)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
