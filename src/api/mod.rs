//! HTTP surface for the storefront client, the payment gateway and the
//! admin console.

pub mod admin;
pub mod orders;
pub mod payments;

use crate::error::AppError;
use crate::health::HealthChecker;
use crate::services::{AdminAuthService, OrderService};

/// Shared handler state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub admin: AdminAuthService,
    pub health: HealthChecker,
}

/// Stamp an error with the propagated request id when one is present.
pub(crate) fn with_request_id(error: AppError, request_id: Option<String>) -> AppError {
    match request_id {
        Some(id) => error.with_request_id(id),
        None => error,
    }
}
