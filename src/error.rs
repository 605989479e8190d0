//! Unified error handling for the order/payment gateway.
//!
//! Errors are grouped by origin (domain rules, infrastructure, external
//! services, input validation) and mapped onto HTTP status codes and stable
//! machine-readable codes. Signature and OTP failures carry their precise
//! cause for server-side audit logs but always surface to callers as a
//! generic unauthorized response.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::error::DatabaseError;
use crate::gateway::error::GatewayError;

/// Stable error codes for programmatic client handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "ORDER_NOT_FOUND")]
    OrderNotFound,
    #[serde(rename = "CONFLICT")]
    Conflict,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 503, 504)
    #[serde(rename = "GATEWAY_REJECTED")]
    GatewayRejected,
    #[serde(rename = "GATEWAY_UNAVAILABLE")]
    GatewayUnavailable,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Order with the given id doesn't exist
    OrderNotFound { order_id: String },
    /// A transition outside the allowed state-machine edges was attempted
    InvalidTransition {
        order_id: String,
        from: String,
        to: String,
    },
    /// A different payment id was presented for an already-paid order
    PaymentConflict { order_id: String },
    /// A duplicate order creation raced and lost to the unique constraint
    DuplicateOrder { constraint: String },
    /// Client-supplied total disagrees with the computed item sum
    AmountMismatch { computed: i64, supplied: i64 },
    /// Payment confirmation signature did not verify
    SignatureMismatch { gateway_order_id: String },
    /// No live OTP challenge exists for the subject
    OtpNotFound { subject: String },
    /// The OTP challenge is past its TTL
    OtpExpired { subject: String },
    /// The submitted OTP code is wrong
    OtpMismatch { subject: String },
    /// Failed password or session credential check
    Unauthorized,
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// External service errors (the payment gateway)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Gateway unreachable or erroring; the caller may retry
    GatewayUnavailable { message: String },
    /// Gateway actively rejected the request; retrying won't help
    GatewayRejected {
        message: String,
        gateway_code: Option<String>,
    },
    /// External call exceeded its deadline
    Timeout { service: String, timeout_secs: u64 },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    MissingField { field: String },
    InvalidField { field: String, reason: String },
    EmptyLineItems,
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn unauthorized() -> Self {
        Self::new(AppErrorKind::Domain(DomainError::Unauthorized))
    }

    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::OrderNotFound {
            order_id: order_id.into(),
        }))
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.into(),
        }))
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => 404,
                DomainError::InvalidTransition { .. } => 409,
                DomainError::PaymentConflict { .. } => 409,
                DomainError::DuplicateOrder { .. } => 409,
                DomainError::AmountMismatch { .. } => 400,
                DomainError::SignatureMismatch { .. } => 401,
                DomainError::OtpNotFound { .. } => 401,
                DomainError::OtpExpired { .. } => 401,
                DomainError::OtpMismatch { .. } => 401,
                DomainError::Unauthorized => 401,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayUnavailable { .. } => 503,
                ExternalError::GatewayRejected { .. } => 502,
                ExternalError::Timeout { .. } => 504,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
                DomainError::InvalidTransition { .. }
                | DomainError::PaymentConflict { .. }
                | DomainError::DuplicateOrder { .. } => ErrorCode::Conflict,
                DomainError::AmountMismatch { .. } => ErrorCode::InvalidInput,
                DomainError::SignatureMismatch { .. }
                | DomainError::OtpNotFound { .. }
                | DomainError::OtpExpired { .. }
                | DomainError::OtpMismatch { .. }
                | DomainError::Unauthorized => ErrorCode::Unauthorized,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
                ExternalError::GatewayRejected { .. } => ErrorCode::GatewayRejected,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
            },
            AppErrorKind::Validation(_) => ErrorCode::InvalidInput,
        }
    }

    /// Get user-facing error message.
    ///
    /// Credential failures are collapsed into one generic message no matter
    /// which part of the check failed; the detailed reason stays in server
    /// logs only.
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { order_id } => {
                    format!("Order '{}' not found", order_id)
                }
                DomainError::InvalidTransition { order_id, .. } => {
                    format!("Order '{}' cannot transition to the requested state", order_id)
                }
                DomainError::PaymentConflict { order_id } => {
                    format!(
                        "Order '{}' was already settled with a different payment",
                        order_id
                    )
                }
                DomainError::DuplicateOrder { .. } => "Order already exists".to_string(),
                DomainError::AmountMismatch { computed, supplied } => {
                    format!(
                        "Order total {} does not match the supplied amount {}",
                        computed, supplied
                    )
                }
                DomainError::SignatureMismatch { .. } => {
                    "Payment verification failed".to_string()
                }
                DomainError::OtpNotFound { .. }
                | DomainError::OtpExpired { .. }
                | DomainError::OtpMismatch { .. }
                | DomainError::Unauthorized => "Unauthorized".to_string(),
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayUnavailable { .. } => {
                    "Payment gateway is temporarily unavailable. Please try again".to_string()
                }
                ExternalError::GatewayRejected { .. } => {
                    "Payment gateway rejected the request".to_string()
                }
                ExternalError::Timeout {
                    service,
                    timeout_secs,
                } => {
                    format!(
                        "{} request timed out after {} seconds. Please try again",
                        service, timeout_secs
                    )
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
                ValidationError::EmptyLineItems => {
                    "Order must contain at least one line item".to_string()
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::GatewayUnavailable { .. } => true,
                ExternalError::GatewayRejected { .. } => false,
                ExternalError::Timeout { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        use crate::database::error::DatabaseErrorKind;

        let kind = match &err.kind {
            DatabaseErrorKind::UniqueViolation { constraint } => {
                AppErrorKind::Domain(DomainError::DuplicateOrder {
                    constraint: constraint.clone(),
                })
            }
            _ => AppErrorKind::Infrastructure(InfrastructureError::Database {
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            }),
        };
        AppError::new(kind)
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let kind = match err {
            GatewayError::ValidationError { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "gateway".to_string()),
                    reason: message,
                })
            }
            GatewayError::NetworkError { message }
            | GatewayError::UnavailableError { message } => {
                AppErrorKind::External(ExternalError::GatewayUnavailable { message })
            }
            GatewayError::TimeoutError { seconds } => {
                AppErrorKind::External(ExternalError::Timeout {
                    service: "payment gateway".to_string(),
                    timeout_secs: seconds,
                })
            }
            GatewayError::RejectedError {
                message,
                gateway_code,
            } => AppErrorKind::External(ExternalError::GatewayRejected {
                message,
                gateway_code,
            }),
        };
        AppError::new(kind)
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_conflict_maps_to_409() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::PaymentConflict {
            order_id: "order_1".to_string(),
        }));
        assert_eq!(error.status_code(), 409);
        assert_eq!(error.error_code(), ErrorCode::Conflict);
        assert!(!error.is_retryable());
    }

    #[test]
    fn credential_failures_share_a_generic_message() {
        let otp_wrong = AppError::new(AppErrorKind::Domain(DomainError::OtpMismatch {
            subject: "admin@example.com".to_string(),
        }));
        let otp_expired = AppError::new(AppErrorKind::Domain(DomainError::OtpExpired {
            subject: "admin@example.com".to_string(),
        }));
        let password_wrong = AppError::unauthorized();

        assert_eq!(otp_wrong.user_message(), "Unauthorized");
        assert_eq!(otp_wrong.user_message(), otp_expired.user_message());
        assert_eq!(otp_wrong.user_message(), password_wrong.user_message());
        assert_eq!(otp_wrong.status_code(), 401);
    }

    #[test]
    fn gateway_unavailable_is_retryable() {
        let error = AppError::new(AppErrorKind::External(ExternalError::GatewayUnavailable {
            message: "connection refused".to_string(),
        }));
        assert_eq!(error.status_code(), 503);
        assert!(error.is_retryable());
    }

    #[test]
    fn unique_violation_converts_to_conflict() {
        let db = DatabaseError::new(
            crate::database::error::DatabaseErrorKind::UniqueViolation {
                constraint: "orders_gateway_order_id_key".to_string(),
            },
        );
        let error: AppError = db.into();
        assert_eq!(error.status_code(), 409);
        assert_eq!(error.error_code(), ErrorCode::Conflict);
    }
}
