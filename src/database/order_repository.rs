use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::models::{CustomerSnapshot, LineItem, NewOrder, OrderRecord, OrderStatus};
use crate::database::store::OrderStore;

const ORDER_COLUMNS: &str = "order_id, gateway_order_id, gateway_payment_id, gateway_signature, \
     customer, items, amount, currency, status, created_at, updated_at";

/// Raw row shape; JSONB columns are decoded into the snapshot types.
#[derive(Debug, FromRow)]
struct OrderRow {
    order_id: String,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    customer: Json<CustomerSnapshot>,
    items: Json<Vec<LineItem>>,
    amount: i64,
    currency: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

fn into_record(row: OrderRow) -> Result<OrderRecord, DatabaseError> {
    let status = OrderStatus::parse(&row.status).ok_or_else(|| {
        DatabaseError::new(DatabaseErrorKind::Unknown {
            message: format!("unrecognized order status '{}'", row.status),
        })
    })?;
    Ok(OrderRecord {
        order_id: row.order_id,
        gateway_order_id: row.gateway_order_id,
        gateway_payment_id: row.gateway_payment_id.filter(|v| !v.is_empty()),
        gateway_signature: row.gateway_signature.filter(|v| !v.is_empty()),
        customer: row.customer.0,
        items: row.items.0,
        amount: row.amount,
        currency: row.currency,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Postgres-backed order store.
///
/// `order_id` and `gateway_order_id` carry UNIQUE constraints in the schema,
/// so concurrent duplicate inserts fail deterministically at the storage
/// layer. Status transitions are single-statement conditional updates.
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<OrderRecord, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders \
               (order_id, gateway_order_id, customer, items, amount, currency, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending') \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_id)
        .bind(&order.gateway_order_id)
        .bind(Json(&order.customer))
        .bind(Json(&order.items))
        .bind(order.amount)
        .bind(&order.currency)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        into_record(row)
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        row.map(into_record).transpose()
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        row.map(into_record).transpose()
    }

    async fn mark_paid_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders \
             SET status = 'paid', gateway_payment_id = $2, gateway_signature = $3, \
                 updated_at = NOW() \
             WHERE order_id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(gateway_payment_id)
        .bind(gateway_signature)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        row.map(into_record).transpose()
    }

    async fn mark_failed_if_pending(
        &self,
        order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders \
             SET status = 'failed', \
                 gateway_payment_id = COALESCE($2, gateway_payment_id), \
                 updated_at = NOW() \
             WHERE order_id = $1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        row.map(into_record).transpose()
    }

    async fn mark_refunded_if_paid(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders \
             SET status = 'refunded', updated_at = NOW() \
             WHERE order_id = $1 AND status = 'paid' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        row.map(into_record).transpose()
    }
}
