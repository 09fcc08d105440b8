use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use warung_core::domain::customer::{Customer, CustomerId};

use super::decode::{parse_json, parse_timestamp, to_json};
use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

const CUSTOMER_COLUMNS: &str = "id, phone, name, email, addresses_json, order_ids_json,
                                metadata_json, created_at, last_interaction";

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(customer_from_row).transpose()
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customers (id, phone, name, email, addresses_json, order_ids_json,
                                    metadata_json, created_at, last_interaction)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 phone = excluded.phone,
                 name = excluded.name,
                 email = excluded.email,
                 addresses_json = excluded.addresses_json,
                 order_ids_json = excluded.order_ids_json,
                 metadata_json = excluded.metadata_json,
                 last_interaction = excluded.last_interaction",
        )
        .bind(&customer.id.0)
        .bind(&customer.phone)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(to_json("addresses_json", &customer.addresses)?)
        .bind(to_json("order_ids_json", &customer.order_ids)?)
        .bind(to_json("metadata_json", &customer.metadata)?)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.last_interaction.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY last_interaction DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(customer_from_row).collect()
    }
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(row.try_get("id")?),
        phone: row.try_get("phone")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        addresses: parse_json("addresses_json", row.try_get("addresses_json")?)?,
        order_ids: parse_json("order_ids_json", row.try_get("order_ids_json")?)?,
        metadata: parse_json("metadata_json", row.try_get("metadata_json")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        last_interaction: parse_timestamp("last_interaction", row.try_get("last_interaction")?)?,
    })
}
