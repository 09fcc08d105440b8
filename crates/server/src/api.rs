use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::responses::{correlation_id, data, json_body, ApiError};
use crate::sync::{OrderStatusUpdate, SyncGateway};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPatch {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub tracking_number: Option<String>,
}

/// Read-mostly JSON surface for the website's back office.
pub fn router(gateway: Arc<SyncGateway>) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/orders", get(list_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", patch(update_order_status))
        .route("/api/customers", get(list_customers))
        .route("/api/customers/{phone}", get(get_customer))
        .route("/api/stats", get(stats))
        .route("/api/health", get(health))
        .with_state(gateway)
}

async fn list_products(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>, ApiError> {
    let products = gateway
        .products(query.category.as_deref())
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(products))
}

async fn get_product(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let product = gateway
        .product(&id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(product))
}

async fn list_orders(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Value>, ApiError> {
    let orders = gateway
        .orders(query.status.as_deref())
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(orders))
}

async fn get_order(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = gateway
        .order(&id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(order))
}

async fn update_order_status(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<StatusPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let patch = json_body(payload)?;
    let correlation_id = correlation_id(&headers);

    let update = OrderStatusUpdate {
        status: patch.status,
        payment_status: patch.payment_status,
        tracking_number: patch.tracking_number,
        message: None,
    };
    let order = gateway
        .update_order_status(&id, update, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(data(order))
}

async fn list_customers(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let customers = gateway
        .customers()
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(customers))
}

async fn get_customer(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
    Path(phone): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let customer = gateway
        .customer(&phone)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(customer))
}

async fn stats(
    State(gateway): State<Arc<SyncGateway>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let stats = gateway
        .stats()
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id(&headers)))?;
    Ok(data(stats))
}

async fn health(State(gateway): State<Arc<SyncGateway>>) -> Json<Value> {
    data(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "pendingNotifications": gateway.queue().len(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use warung_channel::{NotificationQueue, StoreRepositories};
    use warung_core::audit::InMemoryAuditSink;
    use warung_core::domain::customer::{Customer, CustomerId};

    use super::router;
    use crate::sync::tests::{order, product};
    use crate::sync::SyncGateway;

    async fn seeded() -> (Router, Arc<NotificationQueue>) {
        let queue = Arc::new(NotificationQueue::new(10));
        let gateway = Arc::new(SyncGateway::new(
            StoreRepositories::in_memory(),
            queue.clone(),
            Arc::new(InMemoryAuditSink::default()),
        ));
        gateway
            .sync_catalog(
                vec![product("p-1", "FAS001", "fashion", 3), product("p-2", "ELE001", "elektronik", 0)],
                "seed",
            )
            .await
            .expect("seed catalog");
        gateway.sync_order(order("ORD-1", "628111"), "seed").await.expect("seed order");
        let mut customer = Customer::new(CustomerId("628111".to_owned()));
        customer.name = Some("Budi".to_owned());
        gateway.sync_customer(customer, "seed").await.expect("seed customer");

        (router(gateway), queue)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|body| Body::from(body.to_string())).unwrap_or_else(Body::empty))
            .expect("request should build");

        let response = router.clone().oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        (status, serde_json::from_slice(&bytes).expect("body should be json"))
    }

    #[tokio::test]
    async fn products_can_be_listed_filtered_and_fetched() {
        let (router, _) = seeded().await;

        let (status, payload) = call(&router, "GET", "/api/products", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(2));

        let (_, payload) = call(&router, "GET", "/api/products?category=fashion", None).await;
        assert_eq!(payload["data"][0]["sku"], "FAS001");

        let (status, payload) = call(&router, "GET", "/api/products/p-404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["success"], false);
    }

    #[tokio::test]
    async fn orders_filter_by_status_and_reject_unknown_status() {
        let (router, _) = seeded().await;

        let (_, payload) = call(&router, "GET", "/api/orders?status=pending", None).await;
        assert_eq!(payload["data"][0]["orderId"], "ORD-1");

        let (_, payload) = call(&router, "GET", "/api/orders?status=shipped", None).await;
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(0));

        let (status, _) = call(&router, "GET", "/api/orders?status=lost", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_patch_updates_order_and_notifies_customer() {
        let (router, queue) = seeded().await;

        let (status, payload) = call(
            &router,
            "PATCH",
            "/api/orders/ORD-1/status",
            Some(json!({ "paymentStatus": "paid", "status": "processing" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["data"]["status"], "processing");
        assert_eq!(payload["data"]["paymentStatus"], "paid");
        assert!(!payload["data"]["paidAt"].is_null());

        let queued = queue.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].message, "📦 Update pesanan ORD-1: processing");
    }

    #[tokio::test]
    async fn customers_and_stats_are_exposed() {
        let (router, _) = seeded().await;

        let (_, payload) = call(&router, "GET", "/api/customers", None).await;
        assert_eq!(payload["data"][0]["name"], "Budi");

        let (status, payload) = call(&router, "GET", "/api/customers/0899", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["success"], false);

        let (_, payload) = call(&router, "GET", "/api/customers/08111", None).await;
        assert_eq!(payload["data"]["id"], "628111");

        let (_, payload) = call(&router, "GET", "/api/stats", None).await;
        assert_eq!(payload["data"]["products"]["total"], 2);
        assert_eq!(payload["data"]["products"]["available"], 1);
        assert_eq!(payload["data"]["orders"]["total"], 1);
        assert_eq!(payload["data"]["customers"]["withOrders"], 0);

        let (status, payload) = call(&router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["data"]["status"], "healthy");
    }
}
