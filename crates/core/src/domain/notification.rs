use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::order::{Order, OrderStatus};

/// One outbound chat message waiting for the delivery loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub customer_id: String,
    pub message: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(customer_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Status fan-out for an order. Falls back to the standard update text.
    pub fn order_update(order: &Order, status: OrderStatus, message: Option<&str>) -> Self {
        let text = message
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| default_order_update(order, status));

        Self::new(order.customer_id.0.clone(), text)
            .with_metadata("orderId", order.id.0.clone())
            .with_metadata("status", status.as_str())
            .with_metadata("source", "order-status")
    }
}

pub fn default_order_update(order: &Order, status: OrderStatus) -> String {
    format!("📦 Update pesanan {}: {}", order.id, status)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Notification;
    use crate::domain::cart::Cart;
    use crate::domain::customer::CustomerId;
    use crate::domain::order::{Order, OrderStatus, ShippingAddress};
    use crate::domain::product::{Product, ProductDraft, ProductId};

    fn order() -> Order {
        let product = Product::from_draft(
            ProductId("P-1".to_owned()),
            "KOP001",
            ProductDraft {
                name: "Kopi".to_owned(),
                description: String::new(),
                price: Decimal::new(25_000, 0),
                stock: 2,
                category: "minuman".to_owned(),
                image: None,
            },
        );
        let mut cart = Cart::new(CustomerId("6281234567890".to_owned()));
        cart.add_item(&product, 1, None);
        Order::from_cart(&cart, "Sari", ShippingAddress::from_text("Jl. Mawar 5"))
            .expect("order from cart")
    }

    #[test]
    fn order_update_uses_default_text_when_message_missing() {
        let order = order();
        let notification = Notification::order_update(&order, OrderStatus::Shipped, Some("  "));

        assert_eq!(notification.customer_id, "6281234567890");
        assert_eq!(notification.message, format!("📦 Update pesanan {}: shipped", order.id));
        assert_eq!(notification.metadata["status"], "shipped");
    }

    #[test]
    fn order_update_prefers_caller_message() {
        let notification =
            Notification::order_update(&order(), OrderStatus::Delivered, Some("Sudah sampai"));
        assert_eq!(notification.message, "Sudah sampai");
    }
}
