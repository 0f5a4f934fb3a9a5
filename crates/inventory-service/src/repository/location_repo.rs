//! 库位仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::{LocationRepositoryTrait, LocationStats};
use super::unique_violation;
use crate::error::{InventoryError, Result};
use crate::models::{ChamberDimensions, Location, LocationFilter, NewLocation};

pub(crate) const LOCATION_COLUMNS: &str = r#"
    id, chamber_id, block_no, side_no, row_no, level_no, code,
    max_capacity_kg, current_weight_kg, occupied, active, created_at, updated_at
"#;

/// 库位仓储
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepositoryTrait for LocationRepository {
    async fn get(&self, id: i64) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1",
            LOCATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn list(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {}
            FROM locations
            WHERE ($1::bigint IS NULL OR chamber_id = $1)
              AND ($2::boolean IS NULL OR occupied = $2)
              AND ($3::boolean IS NULL OR active = $3)
              AND ($4::double precision IS NULL OR max_capacity_kg >= $4)
            ORDER BY chamber_id, block_no, side_no, row_no, level_no
            "#,
            LOCATION_COLUMNS
        ))
        .bind(filter.chamber_id)
        .bind(filter.occupied)
        .bind(filter.active)
        .bind(filter.min_capacity_kg)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn create(&self, location: &NewLocation) -> Result<Location> {
        let c = location.coordinates;
        let created = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations
                (chamber_id, block_no, side_no, row_no, level_no, code,
                 max_capacity_kg, current_weight_kg, occupied, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, FALSE, $8, NOW(), NOW())
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        ))
        .bind(location.chamber_id)
        .bind(c.block)
        .bind(c.side)
        .bind(c.row)
        .bind(c.level)
        .bind(location.code())
        .bind(location.max_capacity_kg)
        .bind(location.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateLocation {
                chamber_id: location.chamber_id,
                code: location.code(),
            },
            None => e.into(),
        })?;

        Ok(created)
    }

    async fn create_many(&self, locations: &[NewLocation]) -> Result<u64> {
        if locations.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for location in locations {
            let c = location.coordinates;
            let result = sqlx::query(
                r#"
                INSERT INTO locations
                    (chamber_id, block_no, side_no, row_no, level_no, code,
                     max_capacity_kg, current_weight_kg, occupied, active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, FALSE, $8, NOW(), NOW())
                ON CONFLICT (chamber_id, block_no, side_no, row_no, level_no) DO NOTHING
                "#,
            )
            .bind(location.chamber_id)
            .bind(c.block)
            .bind(c.side)
            .bind(c.row)
            .bind(c.level)
            .bind(location.code())
            .bind(location.max_capacity_kg)
            .bind(location.active)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn update(&self, location: &Location) -> Result<Location> {
        // 承重不得低于当前在库重量，占用中不能停用，在 SQL 里再校验一次
        let updated = sqlx::query_as::<_, Location>(&format!(
            r#"
            UPDATE locations
            SET max_capacity_kg = $2, active = $3, updated_at = NOW()
            WHERE id = $1 AND current_weight_kg <= $2 AND (occupied = FALSE OR $3 = TRUE)
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        ))
        .bind(location.id)
        .bind(location.max_capacity_kg)
        .bind(location.active)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(loc) => Ok(loc),
            None => match self.get(location.id).await? {
                Some(current) if current.occupied && !location.active => {
                    Err(InventoryError::LocationOccupied(current.id))
                }
                Some(current) => Err(InventoryError::CapacityExceeded {
                    location_id: current.id,
                    capacity_kg: location.max_capacity_kg,
                    requested_kg: current.current_weight_kg,
                }),
                None => Err(InventoryError::LocationNotFound(location.id)),
            },
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1 AND occupied = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(_) => Err(InventoryError::LocationOccupied(id)),
                None => Err(InventoryError::LocationNotFound(id)),
            };
        }
        Ok(())
    }

    async fn stats(&self, chamber_id: i64) -> Result<LocationStats> {
        let stats = sqlx::query_as::<_, LocationStats>(
            r#"
            SELECT
                COUNT(*) AS total_locations,
                COUNT(*) FILTER (WHERE active) AS active_locations,
                COUNT(*) FILTER (WHERE occupied) AS occupied_locations,
                COALESCE(SUM(current_weight_kg), 0)::double precision AS stored_weight_kg,
                COALESCE(SUM(max_capacity_kg) FILTER (WHERE active), 0)::double precision AS capacity_kg
            FROM locations
            WHERE chamber_id = $1
            "#,
        )
        .bind(chamber_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn count_outside(&self, chamber_id: i64, dimensions: ChamberDimensions) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM locations
            WHERE chamber_id = $1
              AND (block_no > $2 OR side_no > $3 OR row_no > $4 OR level_no > $5)
            "#,
        )
        .bind(chamber_id)
        .bind(dimensions.blocks)
        .bind(dimensions.sides)
        .bind(dimensions.rows)
        .bind(dimensions.levels)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
