use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::models::OrderRecord;

/// A message handed to the external notifier. This core only produces the
/// payload; delivery and retry are the notifier's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    pub fn order_confirmation(&self, order: &OrderRecord) -> EmailPayload {
        info!(
            order_id = %order.order_id,
            email = %order.customer.email,
            amount = order.amount,
            currency = %order.currency,
            "🔔 NOTIFICATION: Order confirmation queued"
        );
        EmailPayload {
            to: order.customer.email.clone(),
            subject: format!("Your order {} is confirmed", order.order_id),
            body: format!(
                "Hi {},\n\nWe received your payment of {} {} for order {}. \
                 Your prints are on the way!\n",
                order.customer.name,
                order.amount,
                order.currency,
                order.order_id
            ),
        }
    }

    /// The code itself goes only into the payload, never into the log stream.
    pub fn otp_code(
        &self,
        to: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> EmailPayload {
        info!(
            email = %to,
            expires_at = %expires_at,
            "🔔 NOTIFICATION: Admin OTP queued for delivery"
        );
        EmailPayload {
            to: to.to_string(),
            subject: "Your admin verification code".to_string(),
            body: format!(
                "Your one-time verification code is {}. It expires at {}.\n\
                 If you did not request this code, ignore this message.\n",
                code,
                expires_at.to_rfc3339()
            ),
        }
    }

    pub fn refund_requested(&self, order: &OrderRecord) -> EmailPayload {
        info!(
            order_id = %order.order_id,
            email = %order.customer.email,
            amount = order.amount,
            "🔔 NOTIFICATION: Refund initiated"
        );
        EmailPayload {
            to: order.customer.email.clone(),
            subject: format!("Refund initiated for order {}", order.order_id),
            body: format!(
                "Hi {},\n\nA refund of {} {} for order {} has been initiated. \
                 The amount will reach you through the original payment method.\n",
                order.customer.name,
                order.amount,
                order.currency,
                order.order_id
            ),
        }
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}
