use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use warung_core::domain::customer::CustomerId;
use warung_core::domain::order::{Order, OrderId, OrderStatus, PaymentStatus};

use super::decode::{
    parse_decimal, parse_json, parse_optional_timestamp, parse_timestamp, to_json,
};
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, customer_id, customer_name, customer_phone, items_json, subtotal,
                             shipping_cost, total, status, payment_status, payment_method,
                             shipping_address_json, notes, tracking_number, created_at,
                             updated_at, shipped_at, delivered_at, paid_at";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(order_from_row).transpose()
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, customer_name, customer_phone, items_json,
                                 subtotal, shipping_cost, total, status, payment_status,
                                 payment_method, shipping_address_json, notes, tracking_number,
                                 created_at, updated_at, shipped_at, delivered_at, paid_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 customer_id = excluded.customer_id,
                 customer_name = excluded.customer_name,
                 customer_phone = excluded.customer_phone,
                 items_json = excluded.items_json,
                 subtotal = excluded.subtotal,
                 shipping_cost = excluded.shipping_cost,
                 total = excluded.total,
                 status = excluded.status,
                 payment_status = excluded.payment_status,
                 payment_method = excluded.payment_method,
                 shipping_address_json = excluded.shipping_address_json,
                 notes = excluded.notes,
                 tracking_number = excluded.tracking_number,
                 updated_at = excluded.updated_at,
                 shipped_at = excluded.shipped_at,
                 delivered_at = excluded.delivered_at,
                 paid_at = excluded.paid_at",
        )
        .bind(&order.id.0)
        .bind(&order.customer_id.0)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(to_json("items_json", &order.items)?)
        .bind(order.subtotal.to_string())
        .bind(order.shipping_cost.to_string())
        .bind(order.total.to_string())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_method)
        .bind(to_json("shipping_address_json", &order.shipping_address)?)
        .bind(&order.notes)
        .bind(&order.tracking_number)
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .bind(order.shipped_at.map(|at| at.to_rfc3339()))
        .bind(order.delivered_at.map(|at| at.to_rfc3339()))
        .bind(order.paid_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(order_from_row).collect()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = OrderStatus::parse(&status_raw)
        .map_err(|_| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;
    let payment_raw = row.try_get::<String, _>("payment_status")?;
    let payment_status = PaymentStatus::parse(&payment_raw)
        .map_err(|_| RepositoryError::Decode(format!("unknown payment status `{payment_raw}`")))?;

    Ok(Order {
        id: OrderId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        customer_name: row.try_get("customer_name")?,
        customer_phone: row.try_get("customer_phone")?,
        items: parse_json("items_json", row.try_get("items_json")?)?,
        subtotal: parse_decimal("subtotal", row.try_get("subtotal")?)?,
        shipping_cost: parse_decimal("shipping_cost", row.try_get("shipping_cost")?)?,
        total: parse_decimal("total", row.try_get("total")?)?,
        status,
        payment_status,
        payment_method: row.try_get("payment_method")?,
        shipping_address: parse_json(
            "shipping_address_json",
            row.try_get("shipping_address_json")?,
        )?,
        notes: row.try_get("notes")?,
        tracking_number: row.try_get("tracking_number")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        shipped_at: parse_optional_timestamp("shipped_at", row.try_get("shipped_at")?)?,
        delivered_at: parse_optional_timestamp("delivered_at", row.try_get("delivered_at")?)?,
        paid_at: parse_optional_timestamp("paid_at", row.try_get("paid_at")?)?,
    })
}
