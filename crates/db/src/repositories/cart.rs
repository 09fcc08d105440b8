use sqlx::Row;

use warung_core::domain::cart::{Cart, CartLine};
use warung_core::domain::customer::CustomerId;

use super::decode::{parse_json, parse_timestamp, to_json};
use super::{CartRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCartRepository {
    pool: DbPool,
}

impl SqlCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CartRepository for SqlCartRepository {
    async fn find(&self, customer_id: &CustomerId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query("SELECT lines_json, updated_at FROM carts WHERE customer_id = ?")
            .bind(&customer_id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<CartLine> = parse_json("lines_json", row.try_get("lines_json")?)?;
        Ok(Some(Cart {
            customer_id: customer_id.clone(),
            lines,
            updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        }))
    }

    async fn save(&self, cart: Cart) -> Result<(), RepositoryError> {
        if cart.is_empty() {
            return self.clear(&cart.customer_id).await;
        }

        sqlx::query(
            "INSERT INTO carts (customer_id, lines_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(customer_id) DO UPDATE SET
                 lines_json = excluded.lines_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&cart.customer_id.0)
        .bind(to_json("lines_json", &cart.lines)?)
        .bind(cart.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, customer_id: &CustomerId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE customer_id = ?")
            .bind(&customer_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
