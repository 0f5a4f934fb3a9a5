//! 客户仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::ClientRepositoryTrait;
use super::{like_pattern, unique_violation};
use crate::error::{InventoryError, Result};
use crate::models::{Client, ClientFilter, NewClient, PageRequest, Paged};

const CLIENT_COLUMNS: &str = r#"
    id, name, document, email, phone, address, contact_person, active, created_at, updated_at
"#;

/// 客户仓储
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepositoryTrait for ClientRepository {
    async fn get(&self, id: i64) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = $1",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn find_by_document(&self, document: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE document = $1",
            CLIENT_COLUMNS
        ))
        .bind(document)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn list(&self, filter: &ClientFilter, page: PageRequest) -> Result<Paged<Client>> {
        let keyword = like_pattern(filter.keyword.as_deref());

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM clients
            WHERE ($1::text IS NULL OR name ILIKE $1 OR document LIKE $1)
              AND ($2::boolean IS NULL OR active = $2)
            "#,
        )
        .bind(&keyword)
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        if total == 0 {
            return Ok(Paged::new(vec![], 0));
        }

        let items = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {}
            FROM clients
            WHERE ($1::text IS NULL OR name ILIKE $1 OR document LIKE $1)
              AND ($2::boolean IS NULL OR active = $2)
            ORDER BY name ASC, id ASC
            LIMIT $3 OFFSET $4
            "#,
            CLIENT_COLUMNS
        ))
        .bind(&keyword)
        .bind(filter.active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paged::new(items, total))
    }

    async fn create(&self, client: &NewClient) -> Result<Client> {
        let created = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients
                (name, document, email, phone, address, contact_person, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW(), NOW())
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(&client.name)
        .bind(&client.document)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.contact_person)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateDocument(client.document.clone()),
            None => e.into(),
        })?;

        Ok(created)
    }

    async fn update(&self, client: &Client) -> Result<Client> {
        let updated = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = $2, document = $3, email = $4, phone = $5, address = $6,
                contact_person = $7, active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.document)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.contact_person)
        .bind(client.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => InventoryError::DuplicateDocument(client.document.clone()),
            None => e.into(),
        })?;

        updated.ok_or(InventoryError::ClientNotFound(client.id))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let (history,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE client_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        // 有历史产品的客户只停用，保留流水和出库记录的关联
        let result = if history > 0 {
            sqlx::query("UPDATE clients SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
        } else {
            sqlx::query("DELETE FROM clients WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
        };

        if result.rows_affected() == 0 {
            return Err(InventoryError::ClientNotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }
}
