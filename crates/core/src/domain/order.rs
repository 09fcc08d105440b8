use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::customer::{Address, CustomerId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(format!("ORD-{}", token[..10].to_ascii_uppercase()))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::InvalidStatus(raw.to_owned()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            _ => Err(DomainError::InvalidPaymentStatus(raw.to_owned())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
}

impl ShippingAddress {
    pub fn from_text(text: &str) -> Self {
        Self { street: text.trim().to_owned(), ..Self::default() }
    }
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            street: address.street.clone(),
            city: address.city.clone(),
            province: address.province.clone(),
            postal_code: address.postal_code.clone(),
        }
    }
}

/// Line items are a by-value snapshot taken at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "orderId", alias = "id")]
    pub id: OrderId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Snapshots the cart lines into a new pending, unpaid order with zero shipping.
    pub fn from_cart(
        cart: &Cart,
        customer_name: impl Into<String>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let now = Utc::now();
        let mut order = Self {
            id: OrderId::generate(),
            customer_id: cart.customer_id.clone(),
            customer_name: customer_name.into(),
            customer_phone: cart.customer_id.0.clone(),
            items: cart.lines.clone(),
            subtotal: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            shipping_address,
            notes: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
            shipped_at: None,
            delivered_at: None,
            paid_at: None,
        };
        order.recalculate_totals();
        order.validate()?;
        Ok(order)
    }

    pub fn recalculate_totals(&mut self) {
        self.subtotal = self.items.iter().map(|line| line.line_subtotal).sum();
        self.total = self.subtotal + self.shipping_cost;
    }

    /// Fills amounts a partial payload left at zero. Amounts that were sent are kept.
    pub fn fill_missing_amounts(&mut self) {
        for line in &mut self.items {
            if line.line_subtotal.is_zero() {
                line.recalculate();
            }
        }
        if self.subtotal.is_zero() {
            self.subtotal = self.items.iter().map(|line| line.line_subtotal).sum();
        }
        if self.total.is_zero() {
            self.total = self.subtotal + self.shipping_cost;
        }
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.customer_id.0.trim().is_empty() {
            return Err(DomainError::InvalidInput("order requires a customer id".to_owned()));
        }
        if self.customer_name.trim().is_empty() {
            return Err(DomainError::InvalidInput("order requires a customer name".to_owned()));
        }
        if self.customer_phone.trim().is_empty() {
            return Err(DomainError::InvalidInput("order requires a customer phone".to_owned()));
        }
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput("order requires at least one item".to_owned()));
        }
        if self.total <= Decimal::ZERO {
            return Err(DomainError::InvalidInput("order total must be positive".to_owned()));
        }
        Ok(())
    }

    /// Parses and applies a raw status. An unknown value leaves the order untouched.
    pub fn apply_status(&mut self, raw: &str) -> Result<OrderStatus, DomainError> {
        let status = OrderStatus::parse(raw)?;
        self.set_status(status);
        Ok(status)
    }

    /// Any transition is accepted; milestone timestamps are only stamped the first time.
    pub fn set_status(&mut self, status: OrderStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        match status {
            OrderStatus::Shipped => {
                self.shipped_at.get_or_insert(now);
            }
            OrderStatus::Delivered => {
                self.delivered_at.get_or_insert(now);
            }
            _ => {}
        }
    }

    pub fn apply_payment_status(&mut self, raw: &str) -> Result<PaymentStatus, DomainError> {
        let status = PaymentStatus::parse(raw)?;
        self.set_payment_status(status);
        Ok(status)
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        let now = Utc::now();
        self.payment_status = status;
        self.updated_at = now;
        if status == PaymentStatus::Paid {
            self.paid_at.get_or_insert(now);
        }
    }

    pub fn set_tracking_number(&mut self, tracking_number: impl Into<String>) {
        let tracking_number = tracking_number.into();
        let trimmed = tracking_number.trim();
        self.tracking_number = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        self.set_status(OrderStatus::Cancelled);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub revenue: Decimal,
}

impl OrderStatistics {
    /// Revenue counts paid orders only.
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut by_status: BTreeMap<String, usize> =
            OrderStatus::ALL.iter().map(|status| (status.as_str().to_owned(), 0)).collect();
        let mut revenue = Decimal::ZERO;

        for order in orders {
            *by_status.entry(order.status.as_str().to_owned()).or_insert(0) += 1;
            if order.payment_status == PaymentStatus::Paid {
                revenue += order.total;
            }
        }

        Self { total: orders.len(), by_status, revenue }
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

/// Newest first.
pub fn sort_recent_first(orders: &mut [Order]) {
    orders.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}
