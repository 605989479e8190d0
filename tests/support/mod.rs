//! In-memory fakes and fixtures shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pixo_backend::database::error::{DatabaseError, DatabaseErrorKind};
use pixo_backend::database::models::{
    Address, CustomerSnapshot, LineItem, NewOrder, OrderRecord, OrderStatus, OtpChallenge,
};
use pixo_backend::database::store::{OrderStore, OtpStore};
use pixo_backend::gateway::signature;
use pixo_backend::gateway::{
    CreateGatewayOrder, GatewayError, GatewayOrder, GatewayResult, PaymentGateway,
};
use pixo_backend::services::{NotificationService, OrderService, OtpEngine};

pub const TEST_GATEWAY_SECRET: &str = "gw-test-secret";

/// Hash-map-backed order store mirroring the conditional-update semantics of
/// the Postgres repository.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<String, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_id: &str) -> Option<OrderRecord> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.order_id) {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: "orders_pkey".to_string(),
            }));
        }
        if orders
            .values()
            .any(|existing| existing.gateway_order_id == order.gateway_order_id)
        {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: "orders_gateway_order_id_key".to_string(),
            }));
        }

        let now = Utc::now();
        let record = OrderRecord {
            order_id: order.order_id.clone(),
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: None,
            gateway_signature: None,
            customer: order.customer,
            items: order.items,
            amount: order.amount,
            currency: order.currency,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        orders.insert(order.order_id, record.clone());
        Ok(record)
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        Ok(self.orders.lock().unwrap().get(order_id).cloned())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|order| order.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn mark_paid_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(order_id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Paid;
                order.gateway_payment_id = Some(gateway_payment_id.to_string());
                order.gateway_signature = Some(gateway_signature.to_string());
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_failed_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(order_id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = OrderStatus::Failed;
                if let Some(payment_id) = gateway_payment_id {
                    order.gateway_payment_id = Some(payment_id.to_string());
                }
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_refunded_if_paid(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(order_id) {
            Some(order) if order.status == OrderStatus::Paid => {
                order.status = OrderStatus::Refunded;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Hash-map-backed OTP store with the same supersede/consume semantics as
/// the Postgres repository.
#[derive(Default)]
pub struct InMemoryOtpStore {
    challenges: Mutex<Vec<OtpChallenge>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: read the live code for a subject, as the notifier would.
    pub fn live_code(&self, subject_email: &str) -> Option<String> {
        self.challenges
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.subject_email == subject_email && !c.verified)
            .max_by_key(|c| c.created_at)
            .map(|c| c.code.clone())
    }

    /// Test hook: force the live challenge for a subject past its TTL.
    pub fn expire_live(&self, subject_email: &str) {
        let mut challenges = self.challenges.lock().unwrap();
        for challenge in challenges.iter_mut() {
            if challenge.subject_email == subject_email && !challenge.verified {
                challenge.expires_at = Utc::now() - chrono::Duration::seconds(1);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.challenges.lock().unwrap().len()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn replace(
        &self,
        subject_email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, DatabaseError> {
        let mut challenges = self.challenges.lock().unwrap();
        challenges.retain(|c| c.subject_email != subject_email || c.verified);
        let challenge = OtpChallenge {
            id: Uuid::new_v4(),
            subject_email: subject_email.to_string(),
            code: code.to_string(),
            expires_at,
            verified: false,
            created_at: Utc::now(),
        };
        challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn latest_unverified(
        &self,
        subject_email: &str,
    ) -> Result<Option<OtpChallenge>, DatabaseError> {
        Ok(self
            .challenges
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.subject_email == subject_email && !c.verified)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn consume(&self, id: Uuid) -> Result<Option<OtpChallenge>, DatabaseError> {
        let mut challenges = self.challenges.lock().unwrap();
        for challenge in challenges.iter_mut() {
            if challenge.id == id && !challenge.verified && challenge.expires_at > Utc::now() {
                challenge.verified = true;
                return Ok(Some(challenge.clone()));
            }
        }
        Ok(None)
    }

    async fn purge_expired(&self) -> Result<u64, DatabaseError> {
        let mut challenges = self.challenges.lock().unwrap();
        let before = challenges.len();
        challenges.retain(|c| c.expires_at > Utc::now());
        Ok((before - challenges.len()) as u64)
    }
}

/// Gateway fake: real HMAC verification against a test secret, deterministic
/// order ids, optionally scripted creation failures.
pub struct FakeGateway {
    secret: String,
    counter: AtomicUsize,
    fail_with: Mutex<Option<GatewayError>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            secret: TEST_GATEWAY_SECRET.to_string(),
            counter: AtomicUsize::new(0),
            fail_with: Mutex::new(None),
        }
    }

    pub fn fail_next_create(&self, error: GatewayError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    /// Produce a signature the way the real gateway would.
    pub fn sign(gateway_order_id: &str, gateway_payment_id: &str) -> String {
        signature::payment_signature(gateway_order_id, gateway_payment_id, TEST_GATEWAY_SECRET)
    }
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: CreateGatewayOrder) -> GatewayResult<GatewayOrder> {
        if let Some(error) = self.fail_with.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            gateway_order_id: format!("gw_order_{n}"),
            amount: request.amount,
            currency: request.currency,
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
            &self.secret,
        )
    }

    fn key_id(&self) -> &str {
        "rzp_test_fake"
    }
}

pub fn customer() -> CustomerSnapshot {
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

pub fn line_item(title: &str, quantity: u32, unit_price: i64) -> LineItem {
    LineItem {
        product_slug: title.to_lowercase().replace(' ', "-"),
        product_title: title.to_string(),
        product_type: "poster".to_string(),
        size: Some("A3".to_string()),
        quantity,
        unit_price,
    }
}

pub struct TestHarness {
    pub store: Arc<InMemoryOrderStore>,
    pub gateway: Arc<FakeGateway>,
    pub orders: OrderService,
}

pub fn order_harness() -> TestHarness {
    let store = Arc::new(InMemoryOrderStore::new());
    let gateway = Arc::new(FakeGateway::new());
    let orders = OrderService::new(
        store.clone(),
        gateway.clone(),
        NotificationService::new(),
        "INR",
    );
    TestHarness {
        store,
        gateway,
        orders,
    }
}

pub fn otp_engine(ttl_secs: i64) -> (Arc<InMemoryOtpStore>, OtpEngine) {
    let store = Arc::new(InMemoryOtpStore::new());
    let engine = OtpEngine::new(store.clone(), ttl_secs);
    (store, engine)
}
