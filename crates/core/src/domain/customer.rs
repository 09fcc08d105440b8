use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::order::OrderId;
use crate::errors::DomainError;

pub const CHAT_SUFFIX: &str = "@c.us";
pub const GROUP_SUFFIX: &str = "@g.us";

/// Normalized phone identity, e.g. `6281234567890`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn from_phone(raw: &str) -> Self {
        Self(normalize_phone(raw))
    }

    /// Strips the channel suffix from a chat address before normalizing.
    pub fn from_chat_id(chat_id: &str) -> Self {
        let local = chat_id.split('@').next().unwrap_or(chat_id);
        Self::from_phone(local)
    }

    pub fn chat_id(&self) -> String {
        chat_id_for(&self.0)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps digits only, rewrites a leading `0` to `62` and adds `62` when missing.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return digits;
    }
    if let Some(rest) = digits.strip_prefix('0') {
        return format!("62{rest}");
    }
    if digits.starts_with("62") {
        return digits;
    }
    format!("62{digits}")
}

/// Channel address for a customer id. Ids that already carry a domain are used as-is.
pub fn chat_id_for(customer_id: &str) -> String {
    if customer_id.contains('@') {
        customer_id.to_owned()
    } else {
        format!("{}{CHAT_SUFFIX}", normalize_phone(customer_id))
    }
}

pub fn is_group_chat(chat_id: &str) -> bool {
    chat_id.ends_with(GROUP_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default = "generate_address_id")]
    pub id: String,
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

fn generate_address_id() -> String {
    format!("ADDR-{}", &Uuid::new_v4().simple().to_string()[..8])
}

impl Address {
    /// Free-text address as typed into the chat.
    pub fn from_text(text: &str) -> Self {
        Self {
            id: generate_address_id(),
            street: text.trim().to_owned(),
            city: String::new(),
            province: String::new(),
            postal_code: String::new(),
            is_default: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CustomerRecord")]
pub struct Customer {
    pub id: CustomerId,
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default, rename = "orders")]
    pub order_ids: Vec<OrderId>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_interaction: DateTime<Utc>,
}

/// Incoming customer shape. Either `id` or `phone` may be omitted; each fills the other.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default, rename = "orders")]
    order_ids: Vec<OrderId>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    last_interaction: DateTime<Utc>,
}

impl TryFrom<CustomerRecord> for Customer {
    type Error = DomainError;

    fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
        let present = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        let id = present(record.id);
        let phone = present(record.phone);

        let (id, phone) = match (id, phone) {
            (Some(id), Some(phone)) => (CustomerId(id), phone),
            (Some(id), None) => (CustomerId(id.clone()), id),
            (None, Some(phone)) => (CustomerId::from_phone(&phone), phone),
            (None, None) => {
                return Err(DomainError::InvalidInput(
                    "customer requires an id or phone".to_owned(),
                ))
            }
        };

        Ok(Self {
            id,
            phone,
            name: record.name,
            email: record.email,
            addresses: record.addresses,
            order_ids: record.order_ids,
            metadata: record.metadata,
            created_at: record.created_at,
            last_interaction: record.last_interaction,
        })
    }
}

impl Customer {
    pub fn new(id: CustomerId) -> Self {
        let now = Utc::now();
        Self {
            phone: id.0.clone(),
            id,
            name: None,
            email: None,
            addresses: Vec::new(),
            order_ids: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            last_interaction: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_interaction = Utc::now();
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    /// Records an order reference once. Returns `false` when it was already present.
    pub fn add_order(&mut self, order_id: &OrderId) -> bool {
        if self.order_ids.contains(order_id) {
            return false;
        }
        self.order_ids.push(order_id.clone());
        true
    }

    /// The address flagged default, falling back to the most recently added one.
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|address| address.is_default).or_else(|| self.addresses.last())
    }

    /// Adds an address. The first one or one flagged default becomes the sole default.
    pub fn add_address(&mut self, mut address: Address) {
        if self.addresses.is_empty() {
            address.is_default = true;
        }
        if address.is_default {
            for existing in &mut self.addresses {
                existing.is_default = false;
            }
        }
        self.addresses.push(address);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStatistics {
    pub total: usize,
    pub with_orders: usize,
    pub active_this_month: usize,
    pub total_orders: usize,
}

impl CustomerStatistics {
    pub fn from_customers(customers: &[Customer], now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::days(30);
        Self {
            total: customers.len(),
            with_orders: customers.iter().filter(|c| !c.order_ids.is_empty()).count(),
            active_this_month: customers.iter().filter(|c| c.last_interaction >= cutoff).count(),
            total_orders: customers.iter().map(|c| c.order_ids.len()).sum(),
        }
    }
}
