use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use warung_core::domain::product::{Product, ProductId};

use super::decode::{parse_decimal, parse_json, parse_timestamp, parse_u32, to_json};
use super::{ProductRepository, RepositoryError, StockRequest};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, stock, category, images_json,
                               variants_json, is_available, created_at, updated_at";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn upsert(
    tx: &mut Transaction<'_, Sqlite>,
    product: &Product,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO products (id, sku, name, description, price, stock, category, images_json,
                               variants_json, is_available, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             sku = excluded.sku,
             name = excluded.name,
             description = excluded.description,
             price = excluded.price,
             stock = excluded.stock,
             category = excluded.category,
             images_json = excluded.images_json,
             variants_json = excluded.variants_json,
             is_available = excluded.is_available,
             updated_at = excluded.updated_at",
    )
    .bind(&product.id.0)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price.to_string())
    .bind(i64::from(product.stock))
    .bind(&product.category)
    .bind(to_json("images_json", &product.images)?)
    .bind(to_json("variants_json", &product.variants)?)
    .bind(product.is_available)
    .bind(product.created_at.to_rfc3339())
    .bind(product.updated_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY lower(name) ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(product_from_row).transpose()
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE upper(sku) = upper(?) ORDER BY id LIMIT 1"
        ))
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(product_from_row).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        upsert(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_all(&self, products: Vec<Product>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for product in &products {
            upsert(&mut tx, product).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reserve_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError> {
        let merged = StockRequest::merge(requests);
        let mut tx = self.pool.begin().await?;

        for request in &merged {
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - ?
                 WHERE id = ? AND is_available = 1 AND stock >= ?",
            )
            .bind(i64::from(request.quantity))
            .bind(&request.product_id.0)
            .bind(i64::from(request.quantity))
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                let current: Option<(i64, bool)> =
                    sqlx::query_as("SELECT stock, is_available FROM products WHERE id = ?")
                        .bind(&request.product_id.0)
                        .fetch_optional(&mut *tx)
                        .await?;
                tx.rollback().await?;

                return Err(match current {
                    None => RepositoryError::NotFound {
                        entity: "product",
                        id: request.product_id.0.clone(),
                    },
                    Some((stock, is_available)) => RepositoryError::InsufficientStock {
                        product_id: request.product_id.clone(),
                        requested: request.quantity,
                        available: if is_available { parse_u32("stock", stock)? } else { 0 },
                    },
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn release_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError> {
        let merged = StockRequest::merge(requests);
        let mut tx = self.pool.begin().await?;
        for request in &merged {
            sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
                .bind(i64::from(request.quantity))
                .bind(&request.product_id.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn product_from_row(row: SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: parse_decimal("price", row.try_get("price")?)?,
        stock: parse_u32("stock", row.try_get("stock")?)?,
        category: row.try_get("category")?,
        images: parse_json("images_json", row.try_get("images_json")?)?,
        variants: parse_json("variants_json", row.try_get("variants_json")?)?,
        is_available: row.try_get("is_available")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
