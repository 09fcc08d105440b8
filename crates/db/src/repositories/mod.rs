use async_trait::async_trait;
use thiserror::Error;

use warung_core::domain::cart::Cart;
use warung_core::domain::customer::{Customer, CustomerId};
use warung_core::domain::order::{Order, OrderId, OrderStatus};
use warung_core::domain::product::{Product, ProductId};

pub mod cart;
pub mod customer;
mod decode;
pub mod memory;
pub mod order;
pub mod product;

pub use cart::SqlCartRepository;
pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryCartRepository, InMemoryCustomerRepository, InMemoryOrderRepository,
    InMemoryProductRepository,
};
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("product `{product_id}` has {available} in stock, {requested} requested")]
    InsufficientStock { product_id: ProductId, requested: u32, available: u32 },
}

/// One product quantity to take out of (or put back into) stock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self { product_id, quantity }
    }

    /// Sums quantities per product, keeping first-seen order.
    pub fn merge(requests: &[StockRequest]) -> Vec<StockRequest> {
        let mut merged: Vec<StockRequest> = Vec::with_capacity(requests.len());
        for request in requests {
            match merged.iter_mut().find(|existing| existing.product_id == request.product_id) {
                Some(existing) => existing.quantity += request.quantity,
                None => merged.push(request.clone()),
            }
        }
        merged
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products ordered by name.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    /// Case-insensitive lookup.
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError>;
    /// Swaps the whole catalog for `products`.
    async fn replace_all(&self, products: Vec<Product>) -> Result<(), RepositoryError>;
    /// Takes every requested quantity out of stock, or none of them.
    async fn reserve_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError>;
    async fn release_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, customer_id: &CustomerId) -> Result<Option<Cart>, RepositoryError>;
    async fn save(&self, cart: Cart) -> Result<(), RepositoryError>;
    async fn clear(&self, customer_id: &CustomerId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
    /// Most recent first, optionally filtered by status.
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError>;
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;
}
