use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{with_request_id, AppState};
use crate::api::orders::OrderView;
use crate::error::AppError;
use crate::middleware::error::get_request_id_from_headers;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub otp_issued: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub session_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    state
        .admin
        .login(&payload.password)
        .await
        .map_err(|e| with_request_id(e, request_id))?;
    Ok(Json(LoginResponse { otp_issued: true }))
}

/// POST /api/admin/verify
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let grant = state
        .admin
        .verify(&payload.code)
        .await
        .map_err(|e| with_request_id(e, request_id))?;
    Ok(Json(VerifyOtpResponse {
        session_token: grant.token,
        expires_at: grant.expires_at,
    }))
}

/// POST /api/admin/orders/{order_id}/refund
///
/// Session-gated. Flips `paid -> refunded` and signals the monetary refund
/// to the external gateway collaborator.
pub async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderView>, AppError> {
    let request_id = get_request_id_from_headers(&headers);

    let token = bearer_token(&headers)
        .ok_or_else(|| with_request_id(AppError::unauthorized(), request_id.clone()))?;
    state
        .admin
        .authorize(token)
        .map_err(|e| with_request_id(e, request_id.clone()))?;

    let order = state
        .orders
        .refund(&order_id)
        .await
        .map_err(|e| with_request_id(e, request_id))?;
    Ok(Json(OrderView::from(&order)))
}
