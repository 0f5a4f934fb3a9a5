//! 产品仓储
//!
//! 产品的所有写入都经过 [`ProductRepository::commit`]，在一个事务里完成
//! 产品行、库位占用、流水和出库申请的变更

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::location_repo::LOCATION_COLUMNS;
use super::movement_repo::MOVEMENT_COLUMNS;
use super::traits::ProductRepositoryTrait;
use super::withdrawal_repo::WITHDRAWAL_COLUMNS;
use super::{like_pattern, unique_violation};
use crate::error::{InventoryError, Result};
use crate::models::{
    CommitResult, Location, LocationChange, Movement, NewMovement, PageRequest, Paged, Product,
    ProductCommit, ProductFilter, ProductStatus, ProductWrite, WithdrawalRequest, WithdrawalWrite,
};

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.name, p.lot, p.seed_type, p.quantity, p.unit_weight_kg, p.total_weight_kg,
    p.storage_type, p.client_id, p.location_id, p.status, p.expiration_date, p.notes,
    p.version, p.created_by, p.created_at, p.updated_at
"#;

/// 产品仓储
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_product(conn: &mut PgConnection, write: ProductWrite) -> Result<Product> {
        match write {
            ProductWrite::Insert(p) => {
                let location_id = p.location_id;
                sqlx::query_as::<_, Product>(&format!(
                    r#"
                    INSERT INTO products AS p
                        (name, lot, seed_type, quantity, unit_weight_kg, total_weight_kg,
                         storage_type, client_id, location_id, status, expiration_date, notes,
                         version, created_by, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13, NOW(), NOW())
                    RETURNING {}
                    "#,
                    PRODUCT_COLUMNS
                ))
                .bind(&p.name)
                .bind(&p.lot)
                .bind(&p.seed_type)
                .bind(p.quantity)
                .bind(p.unit_weight_kg)
                .bind(p.total_weight_kg)
                .bind(p.storage_type)
                .bind(p.client_id)
                .bind(p.location_id)
                .bind(p.status)
                .bind(p.expiration_date)
                .bind(&p.notes)
                .bind(p.created_by)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| location_conflict(e, location_id))
            }
            ProductWrite::Update {
                product,
                expected_version,
            } => {
                let updated = sqlx::query_as::<_, Product>(&format!(
                    r#"
                    UPDATE products AS p
                    SET name = $3, lot = $4, seed_type = $5, quantity = $6, unit_weight_kg = $7,
                        total_weight_kg = $8, storage_type = $9, location_id = $10, status = $11,
                        expiration_date = $12, notes = $13,
                        version = p.version + 1, updated_at = NOW()
                    WHERE p.id = $1 AND p.version = $2
                    RETURNING {}
                    "#,
                    PRODUCT_COLUMNS
                ))
                .bind(product.id)
                .bind(expected_version)
                .bind(&product.name)
                .bind(&product.lot)
                .bind(&product.seed_type)
                .bind(product.quantity)
                .bind(product.unit_weight_kg)
                .bind(product.total_weight_kg)
                .bind(product.storage_type)
                .bind(product.location_id)
                .bind(product.status)
                .bind(product.expiration_date)
                .bind(&product.notes)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| location_conflict(e, product.location_id))?;

                match updated {
                    Some(p) => Ok(p),
                    None => {
                        let exists: Option<(i64,)> =
                            sqlx::query_as("SELECT id FROM products WHERE id = $1")
                                .bind(product.id)
                                .fetch_optional(&mut *conn)
                                .await?;
                        match exists {
                            Some(_) => Err(InventoryError::ConcurrencyConflict {
                                product_id: product.id,
                                expected_version,
                            }),
                            None => Err(InventoryError::ProductNotFound(product.id)),
                        }
                    }
                }
            }
        }
    }

    /// 条件更新库位，失败时读出库位给出具体原因
    async fn apply_location_change(conn: &mut PgConnection, change: LocationChange) -> Result<()> {
        let result = match change {
            LocationChange::Occupy {
                location_id,
                weight_kg,
            } => {
                sqlx::query(
                    r#"
                    UPDATE locations
                    SET occupied = TRUE, current_weight_kg = $2, updated_at = NOW()
                    WHERE id = $1 AND active = TRUE AND occupied = FALSE AND max_capacity_kg >= $2
                    "#,
                )
                .bind(location_id)
                .bind(weight_kg)
                .execute(&mut *conn)
                .await?
            }
            LocationChange::Release { location_id } => {
                sqlx::query(
                    r#"
                    UPDATE locations
                    SET occupied = FALSE, current_weight_kg = 0, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(location_id)
                .execute(&mut *conn)
                .await?
            }
            LocationChange::Reweigh {
                location_id,
                weight_kg,
            } => {
                sqlx::query(
                    r#"
                    UPDATE locations
                    SET current_weight_kg = $2, updated_at = NOW()
                    WHERE id = $1 AND occupied = TRUE AND max_capacity_kg >= $2
                    "#,
                )
                .bind(location_id)
                .bind(weight_kg)
                .execute(&mut *conn)
                .await?
            }
        };

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let location_id = change.location_id();
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1",
            LOCATION_COLUMNS
        ))
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(InventoryError::LocationNotFound(location_id))?;

        match change {
            LocationChange::Occupy { weight_kg, .. } => location.can_hold(weight_kg)?,
            LocationChange::Reweigh { weight_kg, .. } => location.check_weight(weight_kg)?,
            LocationChange::Release { .. } => {}
        }
        Err(InventoryError::Internal(format!(
            "库位状态异常: location_id={}",
            location_id
        )))
    }

    async fn insert_movement(
        conn: &mut PgConnection,
        product_id: i64,
        m: NewMovement,
    ) -> Result<Movement> {
        let movement = sqlx::query_as::<_, Movement>(&format!(
            r#"
            INSERT INTO movements
                (product_id, movement_type, from_location_id, to_location_id,
                 from_location_code, to_location_code, from_status, to_status,
                 quantity, weight_kg, user_id, reason, automatic, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .bind(m.movement_type)
        .bind(m.from_location_id)
        .bind(m.to_location_id)
        .bind(&m.from_location_code)
        .bind(&m.to_location_code)
        .bind(m.from_status)
        .bind(m.to_status)
        .bind(m.quantity)
        .bind(m.weight_kg)
        .bind(m.user_id)
        .bind(&m.reason)
        .bind(m.automatic)
        .fetch_one(&mut *conn)
        .await?;

        Ok(movement)
    }

    async fn write_withdrawal(
        conn: &mut PgConnection,
        product_id: i64,
        write: WithdrawalWrite,
    ) -> Result<WithdrawalRequest> {
        match write {
            WithdrawalWrite::Insert(w) => sqlx::query_as::<_, WithdrawalRequest>(&format!(
                r#"
                INSERT INTO withdrawal_requests
                    (product_id, requested_by, reason, quantity, product_quantity, status,
                     created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, 'PENDING', NOW(), NOW())
                RETURNING {}
                "#,
                WITHDRAWAL_COLUMNS
            ))
            .bind(product_id)
            .bind(w.requested_by)
            .bind(&w.reason)
            .bind(w.quantity)
            .bind(w.product_quantity)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => InventoryError::WithdrawalAlreadyPending(product_id),
                None => e.into(),
            }),
            WithdrawalWrite::Update(w) => {
                let updated = sqlx::query_as::<_, WithdrawalRequest>(&format!(
                    r#"
                    UPDATE withdrawal_requests
                    SET status = $2, decided_by = $3, decided_at = $4, decision_note = $5,
                        updated_at = NOW()
                    WHERE id = $1 AND status = 'PENDING'
                    RETURNING {}
                    "#,
                    WITHDRAWAL_COLUMNS
                ))
                .bind(w.id)
                .bind(w.status)
                .bind(w.decided_by)
                .bind(w.decided_at)
                .bind(&w.decision_note)
                .fetch_optional(&mut *conn)
                .await?;

                updated.ok_or(InventoryError::WithdrawalNotPending(w.id))
            }
        }
    }
}

/// 产品库位唯一索引冲突视为库位已被占用
fn location_conflict(e: sqlx::Error, location_id: Option<i64>) -> InventoryError {
    match (unique_violation(&e), location_id) {
        (Some(_), Some(id)) => InventoryError::LocationOccupied(id),
        _ => e.into(),
    }
}

#[async_trait]
impl ProductRepositoryTrait for ProductRepository {
    async fn get(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products p WHERE p.id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>> {
        let keyword = like_pattern(filter.keyword.as_deref());
        let conditions = r#"
            WHERE ($1::varchar IS NULL OR p.status = $1)
              AND ($2::bigint IS NULL OR p.client_id = $2)
              AND ($3::bigint IS NULL OR l.chamber_id = $3)
              AND ($4::bigint IS NULL OR p.location_id = $4)
              AND ($5::text IS NULL OR p.name ILIKE $5 OR p.lot ILIKE $5)
        "#;

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM products p LEFT JOIN locations l ON l.id = p.location_id {}",
            conditions
        ))
        .bind(filter.status)
        .bind(filter.client_id)
        .bind(filter.chamber_id)
        .bind(filter.location_id)
        .bind(&keyword)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Paged::new(vec![], 0));
        }

        let items = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products p
            LEFT JOIN locations l ON l.id = p.location_id
            {}
            ORDER BY p.updated_at DESC, p.id DESC
            LIMIT $6 OFFSET $7
            "#,
            PRODUCT_COLUMNS, conditions
        ))
        .bind(filter.status)
        .bind(filter.client_id)
        .bind(filter.chamber_id)
        .bind(filter.location_id)
        .bind(&keyword)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged::new(items, total))
    }

    async fn commit(&self, commit: ProductCommit) -> Result<CommitResult> {
        let mut tx = self.pool.begin().await?;

        let product = Self::write_product(&mut *tx, commit.product).await?;

        for change in commit.locations {
            Self::apply_location_change(&mut *tx, change).await?;
        }

        let movement = match commit.movement {
            Some(m) => Some(Self::insert_movement(&mut *tx, product.id, m).await?),
            None => None,
        };

        let withdrawal = match commit.withdrawal {
            Some(w) => Some(Self::write_withdrawal(&mut *tx, product.id, w).await?),
            None => None,
        };

        tx.commit().await?;

        Ok(CommitResult {
            product,
            movement,
            withdrawal,
        })
    }

    async fn count_by_status(&self) -> Result<Vec<(ProductStatus, i64)>> {
        let rows: Vec<(ProductStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM products GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows)
    }

    async fn count_active_by_client(&self, client_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE client_id = $1 AND status NOT IN ('RETIRADO', 'REMOVIDO', 'CANCELADO')
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
