use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use warung_channel::events::InboundMessage;
use warung_core::config::SyncConfig;
use warung_core::domain::customer::Customer;
use warung_core::domain::order::Order;
use warung_core::domain::product::Product;

use crate::responses::{correlation_id, json_body, message, ApiError};
use crate::sync::{OrderStatusUpdate, SyncGateway};

pub const WEBHOOK_SECRET_HEADER: &str = "x-warung-webhook-secret";

#[derive(Clone)]
pub struct WebhookState {
    gateway: Arc<SyncGateway>,
    sync: Arc<SyncConfig>,
    inbound: Option<mpsc::Sender<InboundMessage>>,
}

#[derive(Debug, Deserialize)]
struct ProductsPayload {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    order: Option<Order>,
}

#[derive(Debug, Deserialize)]
struct CustomerPayload {
    customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusPayload {
    order_id: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    tracking_number: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessagePayload {
    customer_id: Option<String>,
    message: Option<String>,
    metadata: Option<Map<String, Value>>,
}

/// Website-to-store webhooks plus the bridge's inbound message hook.
///
/// `inbound` is `None` when no chat bridge is configured.
pub fn router(
    gateway: Arc<SyncGateway>,
    sync: SyncConfig,
    inbound: Option<mpsc::Sender<InboundMessage>>,
) -> Router {
    Router::new()
        .route("/webhook/products", post(sync_products))
        .route("/webhook/orders", post(sync_order))
        .route("/webhook/customers", post(sync_customer))
        .route("/webhook/order-status", post(order_status))
        .route("/webhook/send-message", post(send_message))
        .route("/channel/inbound", post(channel_inbound))
        .with_state(WebhookState { gateway, sync: Arc::new(sync), inbound })
}

fn webhook_guard(headers: &HeaderMap, state: &WebhookState) -> Result<(), ApiError> {
    if state.sync.webhook_secret.is_none() {
        return Ok(());
    }

    let provided = headers.get(WEBHOOK_SECRET_HEADER).and_then(|value| value.to_str().ok());
    match provided {
        None => Err(ApiError::unauthorized("missing webhook secret")),
        Some(value) if !state.sync.webhook_secret_matches(Some(value)) => {
            Err(ApiError::unauthorized("invalid webhook secret"))
        }
        Some(_) => Ok(()),
    }
}

async fn sync_products(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<ProductsPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    webhook_guard(&headers, &state)?;
    let payload = json_body(payload)?;
    let correlation_id = correlation_id(&headers);

    state
        .gateway
        .sync_catalog(payload.products, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(message("Products synced successfully"))
}

async fn sync_order(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<OrderPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    webhook_guard(&headers, &state)?;
    let Some(order) = json_body(payload)?.order else {
        return Err(ApiError::bad_request("Order data required"));
    };
    let correlation_id = correlation_id(&headers);

    state
        .gateway
        .sync_order(order, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(message("Order synced successfully"))
}

async fn sync_customer(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<CustomerPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    webhook_guard(&headers, &state)?;
    let Some(customer) = json_body(payload)?.customer else {
        return Err(ApiError::bad_request("Customer data required"));
    };
    let correlation_id = correlation_id(&headers);

    state
        .gateway
        .sync_customer(customer, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(message("Customer synced successfully"))
}

async fn order_status(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<OrderStatusPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    webhook_guard(&headers, &state)?;
    let payload = json_body(payload)?;
    let Some(order_id) = payload.order_id.filter(|id| !id.trim().is_empty()) else {
        return Err(ApiError::bad_request("Order ID required"));
    };
    let correlation_id = correlation_id(&headers);

    let update = OrderStatusUpdate {
        status: payload.status,
        payment_status: payload.payment_status,
        tracking_number: payload.tracking_number,
        message: payload.message,
    };
    state
        .gateway
        .update_order_status(order_id.trim(), update, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(message("Order updated and notification queued"))
}

async fn send_message(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<SendMessagePayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    webhook_guard(&headers, &state)?;
    let payload = json_body(payload)?;
    let (Some(customer_id), Some(text)) = (payload.customer_id, payload.message) else {
        return Err(ApiError::bad_request("customerId and message are required"));
    };
    let correlation_id = correlation_id(&headers);

    state
        .gateway
        .send_message(&customer_id, &text, payload.metadata, &correlation_id)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;
    Ok(message("Message queued and will be sent to WhatsApp"))
}

async fn channel_inbound(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    webhook_guard(&headers, &state)?;
    let inbound = json_body(payload)?;
    let Some(sender) = &state.inbound else {
        return Err(ApiError::unavailable("chat bridge is not configured"));
    };

    let message_id = inbound.id.clone();
    if let Err(error) = sender.send(inbound).await {
        warn!(
            event_name = "ingress.channel.inbound_dropped",
            message_id = %message_id,
            error = %error,
            "channel runner is not accepting messages"
        );
        return Err(ApiError::unavailable("channel runner is not running"));
    }

    info!(
        event_name = "ingress.channel.inbound_accepted",
        message_id = %message_id,
        "inbound message accepted"
    );
    Ok((StatusCode::ACCEPTED, message("Message accepted")))
}
