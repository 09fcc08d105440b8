use std::collections::HashMap;

use tokio::sync::RwLock;

use warung_core::domain::cart::Cart;
use warung_core::domain::customer::{Customer, CustomerId};
use warung_core::domain::order::{sort_recent_first, Order, OrderId, OrderStatus};
use warung_core::domain::product::{Product, ProductId};

use super::{
    CartRepository, CustomerRepository, OrderRepository, ProductRepository, RepositoryError,
    StockRequest,
};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: Vec<Product>) -> Self {
        let products =
            products.into_iter().map(|product| (product.id.0.clone(), product)).collect();
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut listed: Vec<Product> = products.values().cloned().collect();
        listed.sort_by(|a, b| {
            a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id))
        });
        Ok(listed)
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let sku = sku.trim();
        let products = self.products.read().await;
        let mut matches: Vec<&Product> =
            products.values().filter(|product| product.sku.eq_ignore_ascii_case(sku)).collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|product| (*product).clone()))
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        Ok(products.remove(&id.0).is_some())
    }

    async fn replace_all(&self, replacement: Vec<Product>) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        *products =
            replacement.into_iter().map(|product| (product.id.0.clone(), product)).collect();
        Ok(())
    }

    async fn reserve_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError> {
        let merged = StockRequest::merge(requests);
        let mut products = self.products.write().await;

        for request in &merged {
            let product = products.get(&request.product_id.0).ok_or_else(|| {
                RepositoryError::NotFound { entity: "product", id: request.product_id.0.clone() }
            })?;
            if !product.can_purchase(request.quantity) {
                return Err(RepositoryError::InsufficientStock {
                    product_id: request.product_id.clone(),
                    requested: request.quantity,
                    available: if product.is_available { product.stock } else { 0 },
                });
            }
        }

        for request in &merged {
            if let Some(product) = products.get_mut(&request.product_id.0) {
                product.stock -= request.quantity;
            }
        }
        Ok(())
    }

    async fn release_stock(&self, requests: &[StockRequest]) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        for request in requests {
            if let Some(product) = products.get_mut(&request.product_id.0) {
                product.stock = product.stock.saturating_add(request.quantity);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: RwLock<HashMap<String, Cart>>,
}

#[async_trait::async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find(&self, customer_id: &CustomerId) -> Result<Option<Cart>, RepositoryError> {
        let carts = self.carts.read().await;
        Ok(carts.get(&customer_id.0).cloned())
    }

    async fn save(&self, cart: Cart) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        if cart.is_empty() {
            carts.remove(&cart.customer_id.0);
        } else {
            carts.insert(cart.customer_id.0.clone(), cart);
        }
        Ok(())
    }

    async fn clear(&self, customer_id: &CustomerId) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        carts.remove(&customer_id.0);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut listed: Vec<Order> = orders
            .values()
            .filter(|order| status.map_or(true, |status| order.status == status))
            .cloned()
            .collect();
        sort_recent_first(&mut listed);
        Ok(listed)
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut listed: Vec<Order> =
            orders.values().filter(|order| &order.customer_id == customer_id).cloned().collect();
        sort_recent_first(&mut listed);
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(&id.0).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        customers.insert(customer.id.0.clone(), customer);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        let mut listed: Vec<Customer> = customers.values().cloned().collect();
        listed.sort_by(|a, b| {
            b.last_interaction.cmp(&a.last_interaction).then_with(|| a.id.cmp(&b.id))
        });
        Ok(listed)
    }
}
