//! Services module for business logic and integrations

pub mod admin_auth;
pub mod notification;
pub mod orders;
pub mod otp;

pub use admin_auth::AdminAuthService;
pub use notification::{EmailPayload, NotificationService};
pub use orders::{CreateOrderInput, OrderService};
pub use otp::{IssuedOtp, OtpEngine};
