//! 冷库仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ChamberRepositoryTrait;
use super::unique_violation;
use crate::error::{InventoryError, Result};
use crate::models::{Chamber, NewChamber};

const CHAMBER_COLUMNS: &str = r#"
    id, name, description, temperature_target, humidity_target,
    blocks, sides, rows, levels, status, created_at, updated_at
"#;

/// 冷库仓储
pub struct ChamberRepository {
    pool: PgPool,
}

impl ChamberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChamberRepositoryTrait for ChamberRepository {
    async fn get(&self, id: i64) -> Result<Option<Chamber>> {
        let chamber = sqlx::query_as::<_, Chamber>(&format!(
            "SELECT {} FROM chambers WHERE id = $1",
            CHAMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(chamber)
    }

    async fn list(&self) -> Result<Vec<Chamber>> {
        let chambers = sqlx::query_as::<_, Chamber>(&format!(
            "SELECT {} FROM chambers ORDER BY name ASC, id ASC",
            CHAMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(chambers)
    }

    async fn create(&self, chamber: &NewChamber) -> Result<Chamber> {
        let created = sqlx::query_as::<_, Chamber>(&format!(
            r#"
            INSERT INTO chambers
                (name, description, temperature_target, humidity_target,
                 blocks, sides, rows, levels, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            RETURNING {}
            "#,
            CHAMBER_COLUMNS
        ))
        .bind(&chamber.name)
        .bind(&chamber.description)
        .bind(chamber.temperature_target)
        .bind(chamber.humidity_target)
        .bind(chamber.dimensions.blocks)
        .bind(chamber.dimensions.sides)
        .bind(chamber.dimensions.rows)
        .bind(chamber.dimensions.levels)
        .bind(chamber.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateChamberName(chamber.name.clone()),
            None => e.into(),
        })?;

        Ok(created)
    }

    async fn update(&self, chamber: &Chamber) -> Result<Chamber> {
        let updated = sqlx::query_as::<_, Chamber>(&format!(
            r#"
            UPDATE chambers
            SET name = $2, description = $3, temperature_target = $4, humidity_target = $5,
                blocks = $6, sides = $7, rows = $8, levels = $9, status = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CHAMBER_COLUMNS
        ))
        .bind(chamber.id)
        .bind(&chamber.name)
        .bind(&chamber.description)
        .bind(chamber.temperature_target)
        .bind(chamber.humidity_target)
        .bind(chamber.dimensions.blocks)
        .bind(chamber.dimensions.sides)
        .bind(chamber.dimensions.rows)
        .bind(chamber.dimensions.levels)
        .bind(chamber.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateChamberName(chamber.name.clone()),
            None => e.into(),
        })?;

        updated.ok_or(InventoryError::ChamberNotFound(chamber.id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // 锁住冷库行，避免删除过程中有产品上架
        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM chambers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(InventoryError::ChamberNotFound(id));
        }

        let (occupied,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM locations WHERE chamber_id = $1 AND occupied = TRUE",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if occupied > 0 {
            return Err(InventoryError::ChamberInUse {
                chamber_id: id,
                occupied,
            });
        }

        sqlx::query("DELETE FROM locations WHERE chamber_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chambers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
