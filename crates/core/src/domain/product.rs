use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

pub const DEFAULT_CATEGORY: &str = "uncategorized";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn generate() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(format!("PROD-{}", token[..12].to_ascii_uppercase()))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named option group such as `size: [S, M, L]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_owned()
}

fn default_available() -> bool {
    true
}

impl Product {
    pub fn from_draft(id: ProductId, sku: impl Into<String>, draft: ProductDraft) -> Self {
        let now = Utc::now();
        let category = normalize_category(&draft.category);
        Self {
            id,
            sku: sku.into(),
            name: draft.name,
            description: draft.description,
            price: draft.price,
            stock: draft.stock,
            category,
            images: draft.image.into_iter().collect(),
            variants: Vec::new(),
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Purchasable when listed for sale, the quantity is positive and stock covers it.
    pub fn can_purchase(&self, quantity: u32) -> bool {
        self.is_available && quantity > 0 && self.stock >= quantity
    }

    /// Shown in the public catalog.
    pub fn is_listed(&self) -> bool {
        self.is_available && self.stock > 0
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "product `{}` must have a name",
                self.id
            )));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::InvalidInput(format!("product `{}` must have a sku", self.id)));
        }
        if self.price.is_sign_negative() {
            return Err(DomainError::InvalidInput(format!(
                "product `{}` price must not be negative",
                self.id
            )));
        }
        Ok(())
    }

    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category) = &patch.category {
            self.category = normalize_category(category);
        }
        if let Some(image) = &patch.image {
            self.images.retain(|existing| existing != image);
            self.images.insert(0, image.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Fully collected fields for a new product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: String,
    pub image: Option<String>,
}

/// Partially collected product fields. Used both while building a draft and as an edit patch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub category: Option<String>,
    pub image: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.image.is_none()
    }

    pub fn into_draft(self) -> Option<ProductDraft> {
        Some(ProductDraft {
            name: self.name?,
            description: self.description.unwrap_or_default(),
            price: self.price?,
            stock: self.stock?,
            category: self.category.unwrap_or_else(default_category),
            image: self.image,
        })
    }

    /// `(field, new value)` pairs in display order.
    pub fn changes(&self) -> Vec<(&'static str, String)> {
        let mut changes = Vec::new();
        if let Some(name) = &self.name {
            changes.push(("name", name.clone()));
        }
        if let Some(description) = &self.description {
            changes.push(("description", description.clone()));
        }
        if let Some(price) = self.price {
            changes.push(("price", price.to_string()));
        }
        if let Some(stock) = self.stock {
            changes.push(("stock", stock.to_string()));
        }
        if let Some(category) = &self.category {
            changes.push(("category", category.clone()));
        }
        if self.image.is_some() {
            changes.push(("image", "updated".to_owned()));
        }
        changes
    }
}

pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        default_category()
    } else {
        trimmed
    }
}

/// First three letters of the category, upper-cased, followed by three random digits.
pub fn generate_sku(category: &str) -> String {
    let prefix: String = category
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let prefix = if prefix.is_empty() { "PRD".to_owned() } else { prefix };
    let digits = rand::thread_rng().gen_range(0..1000);
    format!("{prefix}{digits:03}")
}
