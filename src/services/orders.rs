//! Order lifecycle: creation against the payment gateway and the
//! pending → paid/failed/refunded state machine.
//!
//! Transitions go through the store's compare-and-set methods; the first of
//! two concurrent callback deliveries wins and the loser resolves the
//! outcome from a re-read, so a retried webhook can never double-apply or
//! overwrite a settled order.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{
    CustomerSnapshot, LineItem, NewOrder, OrderRecord, OrderStatus,
};
use crate::database::store::OrderStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};
use crate::gateway::{CreateGatewayOrder, PaymentGateway};
use crate::services::notification::NotificationService;

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub currency: Option<String>,
    /// Client-echoed total, cross-checked against the computed item sum.
    pub expected_amount: Option<i64>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: NotificationService,
    default_currency: String,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern"))
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::missing_field(field));
    }
    Ok(())
}

fn validate_customer(customer: &CustomerSnapshot) -> AppResult<()> {
    require("customer.name", &customer.name)?;
    require("customer.email", &customer.email)?;
    require("customer.phone", &customer.phone)?;
    if !email_pattern().is_match(customer.email.trim()) {
        return Err(AppError::invalid_field(
            "customer.email",
            "not a valid email address",
        ));
    }
    require("customer.address.line1", &customer.address.line1)?;
    require("customer.address.city", &customer.address.city)?;
    require("customer.address.state", &customer.address.state)?;
    require("customer.address.zip_code", &customer.address.zip_code)?;
    require("customer.address.country", &customer.address.country)?;
    Ok(())
}

fn validate_items(items: &[LineItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::EmptyLineItems,
        )));
    }
    for (index, item) in items.iter().enumerate() {
        if item.product_slug.trim().is_empty() || item.product_title.trim().is_empty() {
            return Err(AppError::invalid_field(
                format!("items[{}]", index),
                "product reference and title are required",
            ));
        }
        if item.quantity < 1 {
            return Err(AppError::invalid_field(
                format!("items[{}].quantity", index),
                "quantity must be at least 1",
            ));
        }
        if item.unit_price < 0 {
            return Err(AppError::invalid_field(
                format!("items[{}].unit_price", index),
                "price must not be negative",
            ));
        }
    }
    Ok(())
}

/// Total in minor units; overflow is rejected rather than wrapped.
fn compute_amount(items: &[LineItem]) -> AppResult<i64> {
    let mut total: i64 = 0;
    for (index, item) in items.iter().enumerate() {
        let line = i64::from(item.quantity)
            .checked_mul(item.unit_price)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| {
                AppError::invalid_field(
                    format!("items[{}]", index),
                    "order total overflows the supported range",
                )
            })?;
        total = line;
    }
    Ok(total)
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationService,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            default_currency: default_currency.into(),
        }
    }

    pub fn gateway_key_id(&self) -> &str {
        self.gateway.key_id()
    }

    fn log_transition(&self, order: &OrderRecord, from: OrderStatus) {
        info!(
            order_id = %order.order_id,
            gateway_order_id = %order.gateway_order_id,
            from = %from,
            to = %order.status,
            "order status transition"
        );
    }

    /// Create a `pending` order. The gateway order is registered first;
    /// if that fails nothing is persisted — creation is all-or-nothing.
    pub async fn create(&self, input: CreateOrderInput) -> AppResult<OrderRecord> {
        validate_customer(&input.customer)?;
        validate_items(&input.items)?;

        let amount = compute_amount(&input.items)?;
        if let Some(supplied) = input.expected_amount {
            if supplied != amount {
                return Err(AppError::new(AppErrorKind::Domain(
                    DomainError::AmountMismatch {
                        computed: amount,
                        supplied,
                    },
                )));
            }
        }

        let currency = input
            .currency
            .unwrap_or_else(|| self.default_currency.clone());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(AppError::invalid_field(
                "currency",
                "expected a three-letter ISO code",
            ));
        }

        let order_id = format!("order_{}", Uuid::new_v4().simple());

        let gateway_order = self
            .gateway
            .create_order(CreateGatewayOrder {
                amount,
                currency: currency.clone(),
                receipt: order_id.clone(),
            })
            .await?;

        let record = self
            .store
            .insert(NewOrder {
                order_id: order_id.clone(),
                gateway_order_id: gateway_order.gateway_order_id,
                customer: input.customer,
                items: input.items,
                amount,
                currency,
            })
            .await?;

        info!(
            order_id = %record.order_id,
            gateway_order_id = %record.gateway_order_id,
            amount = record.amount,
            currency = %record.currency,
            "order created"
        );
        Ok(record)
    }

    pub async fn get(&self, order_id: &str) -> AppResult<OrderRecord> {
        self.store
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    /// Apply a claimed payment confirmation.
    ///
    /// The signature is verified before anything else; a forged confirmation
    /// fails the order and reports a generic verification failure. A
    /// verified confirmation flips `pending → paid` exactly once; replaying
    /// the same `(order, payment)` pair returns the settled order, while a
    /// differing payment id on a paid order is a hard conflict.
    pub async fn confirm_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> AppResult<OrderRecord> {
        let order = self
            .store
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(gateway_order_id))?;

        if !self
            .gateway
            .verify_payment_signature(gateway_order_id, gateway_payment_id, signature)
        {
            warn!(
                order_id = %order.order_id,
                gateway_order_id = %gateway_order_id,
                "payment signature verification failed"
            );
            if let Some(updated) = self
                .store
                .mark_failed_if_pending(&order.order_id, Some(gateway_payment_id))
                .await?
            {
                self.log_transition(&updated, order.status);
            }
            return Err(AppError::new(AppErrorKind::Domain(
                DomainError::SignatureMismatch {
                    gateway_order_id: gateway_order_id.to_string(),
                },
            )));
        }

        match self
            .store
            .mark_paid_if_pending(&order.order_id, gateway_payment_id, signature)
            .await?
        {
            Some(updated) => {
                self.log_transition(&updated, order.status);
                self.notifier.order_confirmation(&updated);
                Ok(updated)
            }
            None => self.resolve_paid_conflict(&order.order_id, gateway_payment_id).await,
        }
    }

    /// The compare-and-set missed: someone else settled the order first.
    async fn resolve_paid_conflict(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
    ) -> AppResult<OrderRecord> {
        let current = self
            .store
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        match current.status {
            OrderStatus::Paid
                if current.gateway_payment_id.as_deref() == Some(gateway_payment_id) =>
            {
                info!(
                    order_id = %order_id,
                    "repeated confirmation for an applied payment; idempotent success"
                );
                Ok(current)
            }
            OrderStatus::Paid => {
                warn!(
                    order_id = %order_id,
                    "confirmation carries a different payment id than the applied one"
                );
                Err(AppError::new(AppErrorKind::Domain(
                    DomainError::PaymentConflict {
                        order_id: order_id.to_string(),
                    },
                )))
            }
            status => Err(AppError::new(AppErrorKind::Domain(
                DomainError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from: status.as_str().to_string(),
                    to: OrderStatus::Paid.as_str().to_string(),
                },
            ))),
        }
    }

    /// Explicit failure reported by the gateway. Valid only from `pending`;
    /// a repeated failure notification for an already-failed order is
    /// acknowledged without change.
    pub async fn mark_failed(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
        reason: &str,
    ) -> AppResult<OrderRecord> {
        let order = self
            .store
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| AppError::order_not_found(gateway_order_id))?;

        match self
            .store
            .mark_failed_if_pending(&order.order_id, gateway_payment_id)
            .await?
        {
            Some(updated) => {
                warn!(
                    order_id = %updated.order_id,
                    reason = %reason,
                    "order marked failed"
                );
                self.log_transition(&updated, order.status);
                Ok(updated)
            }
            None => {
                let current = self
                    .store
                    .find_by_order_id(&order.order_id)
                    .await?
                    .ok_or_else(|| AppError::order_not_found(&order.order_id))?;
                match current.status {
                    OrderStatus::Failed => Ok(current),
                    status => Err(AppError::new(AppErrorKind::Domain(
                        DomainError::InvalidTransition {
                            order_id: order.order_id.clone(),
                            from: status.as_str().to_string(),
                            to: OrderStatus::Failed.as_str().to_string(),
                        },
                    ))),
                }
            }
        }
    }

    /// Administrative refund: `paid → refunded`. Signals the monetary refund
    /// to the external collaborator but does not execute it.
    pub async fn refund(&self, order_id: &str) -> AppResult<OrderRecord> {
        match self.store.mark_refunded_if_paid(order_id).await? {
            Some(updated) => {
                self.log_transition(&updated, OrderStatus::Paid);
                self.notifier.refund_requested(&updated);
                Ok(updated)
            }
            None => {
                let current = self
                    .store
                    .find_by_order_id(order_id)
                    .await?
                    .ok_or_else(|| AppError::order_not_found(order_id))?;
                Err(AppError::new(AppErrorKind::Domain(
                    DomainError::InvalidTransition {
                        order_id: order_id.to_string(),
                        from: current.status.as_str().to_string(),
                        to: OrderStatus::Refunded.as_str().to_string(),
                    },
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Address;

    fn item(quantity: u32, unit_price: i64) -> LineItem {
        LineItem {
            product_slug: "neon-skyline".to_string(),
            product_title: "Neon Skyline".to_string(),
            product_type: "poster".to_string(),
            size: Some("A3".to_string()),
            quantity,
            unit_price,
        }
    }

    fn customer() -> CustomerSnapshot {
        CustomerSnapshot {
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+919800000000".to_string(),
            address: Address {
                line1: "12 MG Road".to_string(),
                line2: None,
                city: "Bengaluru".to_string(),
                state: "KA".to_string(),
                zip_code: "560001".to_string(),
                country: "India".to_string(),
            },
        }
    }

    #[test]
    fn amount_is_the_item_sum() {
        let items = vec![item(2, 499), item(1, 1250)];
        assert_eq!(compute_amount(&items).unwrap(), 2 * 499 + 1250);
    }

    #[test]
    fn amount_overflow_is_rejected() {
        let items = vec![item(2, i64::MAX / 2 + 1)];
        assert!(compute_amount(&items).is_err());
    }

    #[test]
    fn empty_items_are_rejected() {
        assert!(validate_items(&[]).is_err());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(validate_items(&[item(0, 499)]).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(validate_items(&[item(1, -1)]).is_err());
    }

    #[test]
    fn free_items_are_allowed() {
        assert!(validate_items(&[item(1, 0)]).is_ok());
    }

    #[test]
    fn customer_email_is_validated() {
        let mut snapshot = customer();
        assert!(validate_customer(&snapshot).is_ok());
        snapshot.email = "not-an-email".to_string();
        assert!(validate_customer(&snapshot).is_err());
    }

    #[test]
    fn missing_address_fields_are_rejected() {
        let mut snapshot = customer();
        snapshot.address.city = "  ".to_string();
        assert!(validate_customer(&snapshot).is_err());
    }
}
