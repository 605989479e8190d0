//! Storage interfaces for the order and OTP records.
//!
//! Services hold these as `Arc<dyn ...>` handles constructed once at process
//! start; no component keeps mutable state between calls. The Postgres
//! implementations live in the sibling repository modules, and tests swap in
//! in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::models::{NewOrder, OrderRecord, OtpChallenge};

/// Order persistence with storage-enforced uniqueness and compare-and-set
/// status transitions.
///
/// Every `mark_*` method applies its transition only when the record is still
/// in the expected source state and returns `None` when it is not; the first
/// concurrent writer wins and losers resolve the outcome from a re-read.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new `pending` order. Duplicate `order_id` or
    /// `gateway_order_id` fails with a unique-violation error.
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, DatabaseError>;

    async fn find_by_order_id(&self, order_id: &str)
        -> Result<Option<OrderRecord>, DatabaseError>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError>;

    /// `pending -> paid`, recording the payment attribution.
    async fn mark_paid_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError>;

    /// `pending -> failed`. The payment id, when the gateway supplied one,
    /// is kept for audit.
    async fn mark_failed_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<OrderRecord>, DatabaseError>;

    /// `paid -> refunded`.
    async fn mark_refunded_if_paid(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError>;
}

/// OTP challenge persistence.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Replace any unconsumed challenge for the subject with a fresh one.
    /// Issuance supersedes: prior unverified codes stop being valid.
    async fn replace(
        &self,
        subject_email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, DatabaseError>;

    /// The most recently issued unverified challenge for the subject, expired
    /// or not; the caller decides how to report expiry.
    async fn latest_unverified(
        &self,
        subject_email: &str,
    ) -> Result<Option<OtpChallenge>, DatabaseError>;

    /// Atomically flip `verified` from false to true. Returns `None` when the
    /// challenge was already consumed or has expired, so two concurrent
    /// validations of the same code cannot both succeed.
    async fn consume(&self, id: Uuid) -> Result<Option<OtpChallenge>, DatabaseError>;

    /// Delete expired challenges; returns the number removed.
    async fn purge_expired(&self) -> Result<u64, DatabaseError>;
}
