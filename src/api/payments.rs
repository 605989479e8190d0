use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{with_request_id, AppState};
use crate::database::models::OrderStatus;
use crate::error::{AppError, ErrorCode};
use crate::middleware::error::get_request_id_from_headers;

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub order_id: String,
    pub status: OrderStatus,
}

/// POST /api/payments/verify
///
/// Client-reported completion. The redirect is only a notification; the
/// signature check decides, so calling this endpoint directly with a forged
/// confirmation cannot mark an order paid.
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    let order = state
        .orders
        .confirm_payment(
            &payload.gateway_order_id,
            &payload.gateway_payment_id,
            &payload.signature,
        )
        .await
        .map_err(|e| with_request_id(e, request_id))?;

    Ok(Json(VerifyPaymentResponse {
        order_id: order.order_id,
        status: order.status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GatewayWebhookEvent {
    pub event: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
}

/// POST /webhooks/gateway
///
/// Success and failure notifications delivered by the gateway. Retried
/// deliveries are expected; an already-settled order acknowledges with 200
/// so the gateway stops retrying, while a forged signature is rejected.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    Json(event): Json<GatewayWebhookEvent>,
) -> impl IntoResponse {
    info!(
        event = %event.event,
        gateway_order_id = %event.gateway_order_id,
        "Received gateway webhook"
    );

    match event.event.as_str() {
        "payment.captured" => {
            let (payment_id, signature) = match (&event.gateway_payment_id, &event.signature) {
                (Some(p), Some(s)) => (p.clone(), s.clone()),
                _ => {
                    warn!(gateway_order_id = %event.gateway_order_id, "Capture webhook missing payment id or signature");
                    return (StatusCode::BAD_REQUEST, "Missing payment attribution").into_response();
                }
            };

            match state
                .orders
                .confirm_payment(&event.gateway_order_id, &payment_id, &signature)
                .await
            {
                Ok(_) => {
                    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
                }
                Err(e) if e.error_code() == ErrorCode::Unauthorized => {
                    warn!(gateway_order_id = %event.gateway_order_id, "Webhook signature rejected");
                    (StatusCode::UNAUTHORIZED, "Invalid signature").into_response()
                }
                Err(e) if e.error_code() == ErrorCode::Conflict => {
                    // Retried delivery racing an applied transition.
                    info!(gateway_order_id = %event.gateway_order_id, "Webhook for settled order acknowledged");
                    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
                }
                Err(e) => e.into_response(),
            }
        }
        "payment.failed" => {
            match state
                .orders
                .mark_failed(
                    &event.gateway_order_id,
                    event.gateway_payment_id.as_deref(),
                    "gateway reported payment failure",
                )
                .await
            {
                Ok(_) => {
                    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
                }
                Err(e) if e.error_code() == ErrorCode::Conflict => {
                    info!(gateway_order_id = %event.gateway_order_id, "Failure webhook for settled order acknowledged");
                    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
                }
                Err(e) => e.into_response(),
            }
        }
        other => {
            info!(event = %other, "Ignoring unhandled gateway event");
            (StatusCode::OK, Json(serde_json::json!({"status": "ignored"}))).into_response()
        }
    }
}
