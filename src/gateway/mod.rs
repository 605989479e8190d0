//! Payment gateway integration: remote order registration and payment
//! confirmation verification.

pub mod client;
pub mod error;
pub mod signature;

pub use client::{CreateGatewayOrder, GatewayOrder, PaymentGateway, RazorpayClient, RazorpayConfig};
pub use error::{GatewayError, GatewayResult};
