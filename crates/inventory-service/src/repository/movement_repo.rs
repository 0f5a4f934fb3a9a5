//! 流水仓储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::MovementRepositoryTrait;
use crate::error::Result;
use crate::models::{Movement, MovementFilter, PageRequest, Paged};

pub(crate) const MOVEMENT_COLUMNS: &str = r#"
    id, product_id, movement_type, from_location_id, to_location_id,
    from_location_code, to_location_code, from_status, to_status,
    quantity, weight_kg, user_id, reason, automatic, created_at
"#;

const MOVEMENT_CONDITIONS: &str = r#"
    WHERE ($1::bigint IS NULL OR product_id = $1)
      AND ($2::bigint IS NULL OR from_location_id = $2 OR to_location_id = $2)
      AND ($3::varchar IS NULL OR movement_type = $3)
      AND ($4::bigint IS NULL OR user_id = $4)
      AND ($5::timestamptz IS NULL OR created_at >= $5)
      AND ($6::timestamptz IS NULL OR created_at < $6)
"#;

/// 流水仓储
pub struct MovementRepository {
    pool: PgPool,
}

impl MovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovementRepositoryTrait for MovementRepository {
    async fn list(&self, filter: &MovementFilter, page: PageRequest) -> Result<Paged<Movement>> {
        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM movements {}",
            MOVEMENT_CONDITIONS
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.movement_type)
        .bind(filter.user_id)
        .bind(filter.since)
        .bind(filter.until)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Paged::new(vec![], 0));
        }

        let items = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {}
            FROM movements
            {}
            ORDER BY created_at DESC, id DESC
            LIMIT $7 OFFSET $8
            "#,
            MOVEMENT_COLUMNS, MOVEMENT_CONDITIONS
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.movement_type)
        .bind(filter.user_id)
        .bind(filter.since)
        .bind(filter.until)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged::new(items, total))
    }

    async fn count_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movements WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
