use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use warung_channel::{NotificationQueue, QueueError, StoreRepositories};
use warung_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use warung_core::domain::catalog::{Catalog, CatalogStats};
use warung_core::domain::customer::{Customer, CustomerId, CustomerStatistics};
use warung_core::domain::notification::Notification;
use warung_core::domain::order::{sort_recent_first, Order, OrderId, OrderStatistics, OrderStatus};
use warung_core::domain::product::{Product, ProductId};
use warung_core::errors::{ApplicationError, DomainError};
use warung_db::repositories::RepositoryError;

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn queue_full(error: QueueError) -> ApplicationError {
    ApplicationError::Integration(error.to_string())
}

fn not_found(entity: &'static str, id: &str) -> ApplicationError {
    ApplicationError::Domain(DomainError::NotFound { entity, id: id.to_owned() })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Changes an upstream system asks for on one order.
#[derive(Clone, Debug, Default)]
pub struct OrderStatusUpdate {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub tracking_number: Option<String>,
    /// Custom text for the customer notification.
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreStats {
    pub products: CatalogStats,
    pub orders: OrderStatistics,
    pub customers: CustomerStatistics,
}

/// Keeps the local store in step with the website and feeds the notification queue.
///
/// Inbound syncs are last-writer-wins: a catalog sync replaces every product,
/// order and customer syncs upsert by id.
pub struct SyncGateway {
    repos: StoreRepositories,
    queue: Arc<NotificationQueue>,
    audit: Arc<dyn AuditSink>,
}

impl SyncGateway {
    pub fn new(
        repos: StoreRepositories,
        queue: Arc<NotificationQueue>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { repos, queue, audit }
    }

    pub fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    pub async fn sync_catalog(
        &self,
        products: Vec<Product>,
        correlation_id: &str,
    ) -> Result<usize, ApplicationError> {
        for product in &products {
            product.validate()?;
        }

        let count = products.len();
        self.repos.products.replace_all(products).await.map_err(persistence)?;

        info!(
            event_name = "sync.catalog.replaced",
            correlation_id,
            product_count = count,
            "catalog replaced from upstream"
        );
        self.record(correlation_id, "sync.catalog_replaced", None, |event| {
            event.with_metadata("product_count", count.to_string())
        });
        Ok(count)
    }

    pub async fn sync_order(
        &self,
        mut order: Order,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        if order.id.0.trim().is_empty() {
            return Err(DomainError::InvalidInput("order id is required".to_owned()).into());
        }
        order.fill_missing_amounts();

        let order_id = order.id.clone();
        self.repos.orders.save(order).await.map_err(persistence)?;

        info!(
            event_name = "sync.order.upserted",
            correlation_id,
            order_id = %order_id,
            "order upserted from upstream"
        );
        self.record(correlation_id, "sync.order_upserted", Some(order_id), |event| event);
        Ok(())
    }

    pub async fn sync_customer(
        &self,
        customer: Customer,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        if customer.id.0.trim().is_empty() {
            return Err(DomainError::InvalidInput("customer id is required".to_owned()).into());
        }

        let customer_id = customer.id.clone();
        self.repos.customers.save(customer).await.map_err(persistence)?;

        info!(
            event_name = "sync.customer.upserted",
            correlation_id,
            customer_id = %customer_id,
            "customer upserted from upstream"
        );
        Ok(())
    }

    /// Applies the update and queues a notice for the order's customer.
    ///
    /// Nothing is saved when a status fails to parse or the queue has no room.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        update: OrderStatusUpdate,
        correlation_id: &str,
    ) -> Result<Order, ApplicationError> {
        let mut order = self.order(order_id).await?;
        self.queue.ensure_capacity().map_err(queue_full)?;

        let mut announced = order.status;
        if let Some(status) = non_blank(update.status.as_deref()) {
            announced = order.apply_status(status)?;
        }
        if let Some(payment_status) = non_blank(update.payment_status.as_deref()) {
            order.apply_payment_status(payment_status)?;
        }
        if let Some(tracking_number) = non_blank(update.tracking_number.as_deref()) {
            order.set_tracking_number(tracking_number);
        }

        self.repos.orders.save(order.clone()).await.map_err(persistence)?;
        info!(
            event_name = "sync.order.status_updated",
            correlation_id,
            order_id = %order.id,
            status = order.status.as_str(),
            payment_status = order.payment_status.as_str(),
            "order status updated"
        );
        self.record(correlation_id, "sync.order_status_updated", Some(order.id.clone()), |event| {
            event
                .with_metadata("status", order.status.as_str())
                .with_metadata("payment_status", order.payment_status.as_str())
        });

        let notification = Notification::order_update(&order, announced, update.message.as_deref());
        self.queue.enqueue(notification).map_err(|error| {
            warn!(
                event_name = "sync.notification.rejected",
                correlation_id,
                order_id = %order.id,
                error = %error,
                "order saved but notification could not be queued"
            );
            queue_full(error)
        })?;

        Ok(order)
    }

    /// Queues a free-form message from the website. Returns the queue depth.
    pub async fn send_message(
        &self,
        customer_id: &str,
        message: &str,
        metadata: Option<Map<String, Value>>,
        correlation_id: &str,
    ) -> Result<usize, ApplicationError> {
        let (Some(customer_id), Some(message)) =
            (non_blank(Some(customer_id)), non_blank(Some(message)))
        else {
            return Err(DomainError::InvalidInput(
                "customerId and message are required".to_owned(),
            )
            .into());
        };

        let mut notification = Notification::new(customer_id, message);
        for (key, value) in metadata.unwrap_or_default() {
            notification = notification.with_metadata(key, value);
        }
        let notification = notification.with_metadata("source", "website");

        let depth = self.queue.enqueue(notification).map_err(queue_full)?;
        info!(
            event_name = "sync.message.queued",
            correlation_id,
            customer_id,
            queue_depth = depth,
            "website message queued"
        );
        Ok(depth)
    }

    pub async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ApplicationError> {
        let products = self.repos.products.list().await.map_err(persistence)?;
        let Some(category) = non_blank(category).map(str::to_lowercase) else {
            return Ok(products);
        };
        Ok(products
            .into_iter()
            .filter(|product| product.category.to_lowercase() == category)
            .collect())
    }

    pub async fn product(&self, id: &str) -> Result<Product, ApplicationError> {
        self.repos
            .products
            .find_by_id(&ProductId(id.to_owned()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| not_found("product", id))
    }

    /// Newest first. An unknown status filter is rejected.
    pub async fn orders(&self, status: Option<&str>) -> Result<Vec<Order>, ApplicationError> {
        let status = non_blank(status).map(OrderStatus::parse).transpose()?;
        let mut orders = self.repos.orders.list(status).await.map_err(persistence)?;
        sort_recent_first(&mut orders);
        Ok(orders)
    }

    pub async fn order(&self, id: &str) -> Result<Order, ApplicationError> {
        self.repos
            .orders
            .find_by_id(&OrderId(id.to_owned()))
            .await
            .map_err(persistence)?
            .ok_or_else(|| not_found("order", id))
    }

    pub async fn customers(&self) -> Result<Vec<Customer>, ApplicationError> {
        self.repos.customers.list().await.map_err(persistence)
    }

    pub async fn customer(&self, phone: &str) -> Result<Customer, ApplicationError> {
        self.repos
            .customers
            .find_by_id(&CustomerId::from_phone(phone))
            .await
            .map_err(persistence)?
            .ok_or_else(|| not_found("customer", phone))
    }

    pub async fn stats(&self) -> Result<StoreStats, ApplicationError> {
        let products = self.repos.products.list().await.map_err(persistence)?;
        let orders = self.repos.orders.list(None).await.map_err(persistence)?;
        let customers = self.customers().await?;

        Ok(StoreStats {
            products: Catalog::new(products).stats(),
            orders: OrderStatistics::from_orders(&orders),
            customers: CustomerStatistics::from_customers(&customers, Utc::now()),
        })
    }

    fn record(
        &self,
        correlation_id: &str,
        event_type: &str,
        order_id: Option<OrderId>,
        decorate: impl FnOnce(AuditEvent) -> AuditEvent,
    ) {
        let context = AuditContext::new(None, order_id, correlation_id, "sync-gateway");
        let event =
            AuditEvent::new(&context, event_type, AuditCategory::Sync, AuditOutcome::Success);
        self.audit.emit(decorate(event));
    }
}
