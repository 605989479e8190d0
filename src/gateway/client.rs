use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::signature;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// Remote order registered with the payment gateway before checkout.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct CreateGatewayOrder {
    /// Minor currency units (paise).
    pub amount: i64,
    pub currency: String,
    /// Local order id, echoed back by the gateway for reconciliation.
    pub receipt: String,
}

/// The payment gateway as seen by the order lifecycle: open a remote order,
/// verify a claimed payment confirmation. The shared secret never leaves the
/// implementation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: CreateGatewayOrder) -> GatewayResult<GatewayOrder>;

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        claimed_signature: &str,
    ) -> bool;

    /// Public key id, safe to hand to the storefront checkout widget.
    fn key_id(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            base_url: "https://api.razorpay.com".to_string(),
            timeout_secs: 15,
        }
    }
}

impl RazorpayConfig {
    pub fn from_env() -> GatewayResult<Self> {
        let key_id =
            std::env::var("RAZORPAY_KEY_ID").map_err(|_| GatewayError::ValidationError {
                message: "RAZORPAY_KEY_ID environment variable is required".to_string(),
                field: Some("RAZORPAY_KEY_ID".to_string()),
            })?;
        let key_secret =
            std::env::var("RAZORPAY_KEY_SECRET").map_err(|_| GatewayError::ValidationError {
                message: "RAZORPAY_KEY_SECRET environment variable is required".to_string(),
                field: Some("RAZORPAY_KEY_SECRET".to_string()),
            })?;

        Ok(Self {
            key_id,
            key_secret,
            base_url: std::env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            timeout_secs: std::env::var("RAZORPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15),
        })
    }
}

pub struct RazorpayClient {
    config: RazorpayConfig,
    http: reqwest::Client,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> GatewayResult<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: CreateGatewayOrder) -> GatewayResult<GatewayOrder> {
        if request.amount <= 0 {
            return Err(GatewayError::ValidationError {
                message: "amount must be greater than 0".to_string(),
                field: Some("amount".to_string()),
            });
        }

        let payload = serde_json::json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
        });

        // Creating a remote order is not idempotent; a retry here could open
        // duplicate gateway orders, so retry policy belongs to the caller.
        let response = self
            .http
            .post(self.endpoint("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::TimeoutError {
                        seconds: self.config.timeout_secs,
                    }
                } else {
                    GatewayError::NetworkError {
                        message: format!("gateway request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(GatewayError::UnavailableError {
                    message: format!("HTTP {}: {}", status, text),
                });
            }
            let parsed: Option<RazorpayErrorEnvelope> = serde_json::from_str(&text).ok();
            let (message, gateway_code) = match parsed {
                Some(envelope) => (envelope.error.description, Some(envelope.error.code)),
                None => (format!("HTTP {}: {}", status, text), None),
            };
            return Err(GatewayError::RejectedError {
                message,
                gateway_code,
            });
        }

        let data: RazorpayOrderData =
            serde_json::from_str(&text).map_err(|e| GatewayError::UnavailableError {
                message: format!("invalid gateway JSON response: {}", e),
            })?;

        info!(
            gateway_order_id = %data.id,
            amount = data.amount,
            currency = %data.currency,
            "gateway order created"
        );

        Ok(GatewayOrder {
            gateway_order_id: data.id,
            amount: data.amount,
            currency: data.currency,
        })
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        claimed_signature: &str,
    ) -> bool {
        signature::verify_payment_signature(
            gateway_order_id,
            gateway_payment_id,
            claimed_signature,
            &self.config.key_secret,
        )
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

#[derive(Debug, Deserialize)]
struct RazorpayOrderData {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorBody,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    code: String,
    description: String,
}
