//! 出库申请仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::WithdrawalRepositoryTrait;
use crate::error::Result;
use crate::models::{PageRequest, Paged, WithdrawalFilter, WithdrawalRequest, WithdrawalStatus};

pub(crate) const WITHDRAWAL_COLUMNS: &str = r#"
    id, product_id, requested_by, reason, quantity, product_quantity, status,
    decided_by, decided_at, decision_note, created_at, updated_at
"#;

/// 出库申请仓储
pub struct WithdrawalRepository {
    pool: PgPool,
}

impl WithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WithdrawalRepositoryTrait for WithdrawalRepository {
    async fn get(&self, id: i64) -> Result<Option<WithdrawalRequest>> {
        let withdrawal = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {} FROM withdrawal_requests WHERE id = $1",
            WITHDRAWAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(withdrawal)
    }

    async fn list(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<Paged<WithdrawalRequest>> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM withdrawal_requests
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::bigint IS NULL OR product_id = $2)
              AND ($3::bigint IS NULL OR requested_by = $3)
            "#,
        )
        .bind(filter.status)
        .bind(filter.product_id)
        .bind(filter.requested_by)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Paged::new(vec![], 0));
        }

        let items = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            r#"
            SELECT {}
            FROM withdrawal_requests
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::bigint IS NULL OR product_id = $2)
              AND ($3::bigint IS NULL OR requested_by = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
            WITHDRAWAL_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.product_id)
        .bind(filter.requested_by)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged::new(items, total))
    }

    async fn find_pending_by_product(&self, product_id: i64) -> Result<Option<WithdrawalRequest>> {
        let withdrawal = sqlx::query_as::<_, WithdrawalRequest>(&format!(
            "SELECT {} FROM withdrawal_requests WHERE product_id = $1 AND status = $2",
            WITHDRAWAL_COLUMNS
        ))
        .bind(product_id)
        .bind(WithdrawalStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        Ok(withdrawal)
    }
}
