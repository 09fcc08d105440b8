use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use warung_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use warung_core::domain::cart::Cart;
use warung_core::domain::customer::{Address, Customer};
use warung_core::domain::order::{Order, ShippingAddress};
use warung_core::errors::DomainError;
use warung_db::repositories::{RepositoryError, StockRequest};

use crate::actor::ActorContext;
use crate::storefront::StoreRepositories;

const POST_COMMIT_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("product `{sku}` cannot supply {requested} (available: {available})")]
    ProductUnavailable { sku: String, name: String, requested: u32, available: u32 },
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The order is stored, but customer bookkeeping or the cart reset kept failing.
    #[error("order `{}` stored but follow-up failed: {reason}", .order.id)]
    Incomplete { order: Box<Order>, reason: String },
}

impl CheckoutError {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Incomplete { order, .. } => Some(order.as_ref()),
            _ => None,
        }
    }
}

/// Turns a customer's cart into an order.
///
/// Stock is reserved first and released again if the order cannot be stored.
/// Once the order row exists it is never rolled back; the customer update and
/// cart reset are retried instead.
pub struct CheckoutService {
    repos: StoreRepositories,
    attempts: u32,
    audit: Arc<dyn AuditSink>,
}

impl CheckoutService {
    pub fn new(repos: StoreRepositories, audit: Arc<dyn AuditSink>) -> Self {
        Self { repos, attempts: POST_COMMIT_ATTEMPTS, audit }
    }

    pub async fn checkout(
        &self,
        actor: &ActorContext,
        name: &str,
        address: &str,
    ) -> Result<Order, CheckoutError> {
        let cart = self
            .repos
            .carts
            .find(&actor.customer_id)
            .await
            .map_err(persistence)?
            .filter(|cart| !cart.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        let requests: Vec<StockRequest> = cart
            .lines
            .iter()
            .map(|line| StockRequest::new(line.product_id.clone(), line.quantity))
            .collect();
        if let Err(error) = self.repos.products.reserve_stock(&requests).await {
            return Err(stock_error(&cart, &requests, error));
        }

        let order = match Order::from_cart(&cart, name.trim(), ShippingAddress::from_text(address))
        {
            Ok(order) => order,
            Err(error) => {
                self.release(&requests).await;
                return Err(CheckoutError::Invalid(error));
            }
        };

        if let Err(error) = self.repos.orders.save(order.clone()).await {
            self.release(&requests).await;
            return Err(persistence(error));
        }

        info!(
            event_name = "checkout.order_created",
            correlation_id = %actor.correlation_id,
            customer_id = %actor.customer_id,
            order_id = %order.id,
            total = %order.total,
            "order created from cart"
        );
        self.audit.emit(
            AuditEvent::new(
                &actor.audit_context(),
                "checkout.order_created",
                AuditCategory::Checkout,
                AuditOutcome::Success,
            )
            .with_order(order.id.clone())
            .with_metadata("total", order.total.to_string())
            .with_metadata("items", order.total_items().to_string()),
        );

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match self.finish(&order, address).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(error) => {
                    warn!(
                        correlation_id = %actor.correlation_id,
                        order_id = %order.id,
                        attempt,
                        error = %error,
                        "post-commit checkout step failed"
                    );
                    last_error = Some(error);
                    if attempt < self.attempts {
                        let backoff = RETRY_DELAY_MS * u64::from(attempt);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        if let Some(error) = last_error {
            self.audit.emit(
                AuditEvent::new(
                    &actor.audit_context(),
                    "checkout.post_commit_failed",
                    AuditCategory::Checkout,
                    AuditOutcome::Failed,
                )
                .with_order(order.id.clone())
                .with_metadata("error", error.to_string()),
            );
            return Err(CheckoutError::Incomplete {
                order: Box::new(order),
                reason: error.to_string(),
            });
        }

        Ok(order)
    }

    /// Records the order on the customer profile and empties the cart. Safe to repeat.
    async fn finish(&self, order: &Order, address: &str) -> Result<(), RepositoryError> {
        let mut customer = self
            .repos
            .customers
            .find_by_id(&order.customer_id)
            .await?
            .unwrap_or_else(|| Customer::new(order.customer_id.clone()));

        customer.name = Some(order.customer_name.clone());
        customer.add_order(&order.id);
        let street = address.trim();
        if !customer.addresses.iter().any(|known| known.street == street) {
            customer.add_address(Address::from_text(street));
        }
        customer.touch();
        self.repos.customers.save(customer).await?;

        self.repos.carts.clear(&order.customer_id).await
    }

    async fn release(&self, requests: &[StockRequest]) {
        if let Err(error) = self.repos.products.release_stock(requests).await {
            warn!(error = %error, "failed to release reserved stock");
        }
    }
}

fn persistence(error: RepositoryError) -> CheckoutError {
    CheckoutError::Persistence(error.to_string())
}

fn stock_error(cart: &Cart, requests: &[StockRequest], error: RepositoryError) -> CheckoutError {
    let (product_id, available) = match &error {
        RepositoryError::InsufficientStock { product_id, available, .. } => {
            (product_id.clone(), *available)
        }
        RepositoryError::NotFound { entity: "product", id } => {
            (warung_core::domain::product::ProductId(id.clone()), 0)
        }
        _ => return persistence(error),
    };

    let requested = StockRequest::merge(requests)
        .into_iter()
        .find(|request| request.product_id == product_id)
        .map_or(0, |request| request.quantity);
    let line = cart.lines.iter().find(|line| line.product_id == product_id);

    CheckoutError::ProductUnavailable {
        sku: line.map_or_else(|| product_id.0.clone(), |line| line.sku.clone()),
        name: line.map_or_else(|| product_id.0.clone(), |line| line.name.clone()),
        requested,
        available,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use warung_core::audit::InMemoryAuditSink;
    use warung_core::domain::admin::AdminAccess;
    use warung_core::domain::cart::Cart;
    use warung_core::domain::customer::{Customer, CustomerId};
    use warung_core::domain::order::{OrderStatus, PaymentStatus};
    use warung_core::domain::product::{Product, ProductDraft, ProductId};
    use warung_db::repositories::{
        CartRepository, CustomerRepository, InMemoryOrderRepository, OrderRepository,
        ProductRepository, RepositoryError,
    };

    use super::{CheckoutError, CheckoutService};
    use crate::actor::ActorContext;
    use crate::storefront::StoreRepositories;

    fn product(id: &str, sku: &str, price: i64, stock: u32) -> Product {
        Product::from_draft(
            ProductId(id.to_owned()),
            sku,
            ProductDraft {
                name: format!("Produk {sku}"),
                description: String::new(),
                price: Decimal::new(price, 0),
                stock,
                category: "umum".to_owned(),
                image: None,
            },
        )
    }

    fn actor() -> ActorContext {
        ActorContext::new("628111@c.us", "msg-1", AdminAccess::user())
    }

    async fn repos_with_cart(stock: u32, quantity: u32) -> StoreRepositories {
        let repos = StoreRepositories::in_memory();
        let item = product("PROD-1", "SKU1", 50_000, stock);
        repos.products.save(item.clone()).await.expect("save product");

        let mut cart = Cart::new(CustomerId("628111".to_owned()));
        cart.add_item(&item, quantity, None);
        repos.carts.save(cart).await.expect("save cart");
        repos
    }

    #[tokio::test]
    async fn checkout_creates_pending_order_and_clears_cart() {
        let repos = repos_with_cart(5, 2).await;
        let audit = InMemoryAuditSink::default();
        let service = CheckoutService::new(repos.clone(), Arc::new(audit.clone()));

        let order = service.checkout(&actor(), "Budi", "Jl. Merdeka 1").await.expect("checkout");

        assert_eq!(order.total, Decimal::new(100_000, 0));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.customer_name, "Budi");

        let cart = repos.carts.find(&order.customer_id).await.expect("find cart");
        assert!(cart.map_or(true, |cart| cart.is_empty()));

        let customer = repos
            .customers
            .find_by_id(&order.customer_id)
            .await
            .expect("find customer")
            .expect("customer should exist");
        assert_eq!(customer.order_ids, vec![order.id.clone()]);
        assert_eq!(customer.name.as_deref(), Some("Budi"));

        let stored = repos.orders.find_by_id(&order.id).await.expect("find order");
        assert!(stored.is_some());

        let stock = repos
            .products
            .find_by_id(&ProductId("PROD-1".to_owned()))
            .await
            .expect("find product")
            .map(|product| product.stock);
        assert_eq!(stock, Some(3));

        assert!(audit.events().iter().any(|event| event.event_type == "checkout.order_created"));
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let repos = StoreRepositories::in_memory();
        let service = CheckoutService::new(repos, Arc::new(InMemoryAuditSink::default()));

        let error = service.checkout(&actor(), "Budi", "Jl. Merdeka 1").await;
        assert!(matches!(error, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn stock_shortage_keeps_cart_and_creates_nothing() {
        let repos = repos_with_cart(5, 2).await;
        repos
            .products
            .save(product("PROD-1", "SKU1", 50_000, 1))
            .await
            .expect("lower stock");
        let service = CheckoutService::new(repos.clone(), Arc::new(InMemoryAuditSink::default()));

        let error = service.checkout(&actor(), "Budi", "Jl. Merdeka 1").await;
        match error {
            Err(CheckoutError::ProductUnavailable { sku, requested, available, .. }) => {
                assert_eq!(sku, "SKU1");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected stock failure, got {other:?}"),
        }

        let customer_id = CustomerId("628111".to_owned());
        let cart = repos.carts.find(&customer_id).await.expect("find cart").expect("cart kept");
        assert_eq!(cart.total_items(), 2);
        assert!(repos.orders.list(None).await.expect("list orders").is_empty());
    }

    struct BrokenCustomers;

    #[async_trait]
    impl CustomerRepository for BrokenCustomers {
        async fn find_by_id(&self, _id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
            Err(RepositoryError::Decode("customer store unavailable".to_owned()))
        }

        async fn save(&self, _customer: Customer) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("customer store unavailable".to_owned()))
        }

        async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn post_commit_failure_still_reports_the_order() {
        let seeded = repos_with_cart(5, 1).await;
        let repos = StoreRepositories {
            products: seeded.products.clone(),
            carts: seeded.carts.clone(),
            orders: Arc::new(InMemoryOrderRepository::default()),
            customers: Arc::new(BrokenCustomers),
        };
        let service = CheckoutService::new(repos.clone(), Arc::new(InMemoryAuditSink::default()));

        let error = service
            .checkout(&actor(), "Budi", "Jl. Merdeka 1")
            .await
            .expect_err("bookkeeping should fail");

        let order = error.order().expect("order should be reported").clone();
        assert!(matches!(error, CheckoutError::Incomplete { .. }));
        assert!(repos.orders.find_by_id(&order.id).await.expect("find order").is_some());
    }
}
