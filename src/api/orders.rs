use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{with_request_id, AppState};
use crate::database::models::{CustomerSnapshot, LineItem, OrderRecord, OrderStatus};
use crate::error::AppError;
use crate::middleware::error::get_request_id_from_headers;
use crate::services::orders::CreateOrderInput;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub currency: Option<String>,
    /// Optional client-side total; rejected when it disagrees with the
    /// server-computed sum.
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    /// Public gateway key for the checkout widget.
    pub key_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: String,
    pub gateway_order_id: String,
    pub status: OrderStatus,
    pub amount: i64,
    pub currency: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&OrderRecord> for OrderView {
    fn from(order: &OrderRecord) -> Self {
        Self {
            order_id: order.order_id.clone(),
            gateway_order_id: order.gateway_order_id.clone(),
            status: order.status,
            amount: order.amount,
            currency: order.currency.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    let order = state
        .orders
        .create(CreateOrderInput {
            customer: payload.customer,
            items: payload.items,
            currency: payload.currency,
            expected_amount: payload.amount,
        })
        .await
        .map_err(|e| with_request_id(e, request_id))?;

    let key_id = state.orders.gateway_key_id().to_string();
    Ok(Json(CreateOrderResponse {
        order_id: order.order_id,
        gateway_order_id: order.gateway_order_id,
        amount: order.amount,
        currency: order.currency,
        key_id,
    }))
}

/// GET /api/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderView>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let order = state
        .orders
        .get(&order_id)
        .await
        .map_err(|e| with_request_id(e, request_id))?;
    Ok(Json(OrderView::from(&order)))
}
