use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::models::OtpChallenge;
use crate::database::store::OtpStore;

const OTP_COLUMNS: &str = "id, subject_email, code, expires_at, verified, created_at";

#[derive(Debug, FromRow)]
struct OtpRow {
    id: Uuid,
    subject_email: String,
    code: String,
    expires_at: DateTime<Utc>,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl From<OtpRow> for OtpChallenge {
    fn from(row: OtpRow) -> Self {
        OtpChallenge {
            id: row.id,
            subject_email: row.subject_email,
            code: row.code,
            expires_at: row.expires_at,
            verified: row.verified,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed OTP challenge store.
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for OtpRepository {
    async fn replace(
        &self,
        subject_email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpChallenge, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        // Supersede: any unconsumed code for the subject stops being valid
        // the moment a new one is issued.
        sqlx::query("DELETE FROM otp_challenges WHERE subject_email = $1 AND verified = FALSE")
            .bind(subject_email)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let row = sqlx::query_as::<_, OtpRow>(&format!(
            "INSERT INTO otp_challenges (subject_email, code, expires_at) \
             VALUES ($1, $2, $3) \
             RETURNING {OTP_COLUMNS}"
        ))
        .bind(subject_email)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn latest_unverified(
        &self,
        subject_email: &str,
    ) -> Result<Option<OtpChallenge>, DatabaseError> {
        let row = sqlx::query_as::<_, OtpRow>(&format!(
            "SELECT {OTP_COLUMNS} FROM otp_challenges \
             WHERE subject_email = $1 AND verified = FALSE \
             ORDER BY created_at DESC \
             LIMIT 1"
        ))
        .bind(subject_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn consume(&self, id: Uuid) -> Result<Option<OtpChallenge>, DatabaseError> {
        // Single conditional update; concurrent validations of the same code
        // race here and exactly one observes the flip.
        let row = sqlx::query_as::<_, OtpRow>(&format!(
            "UPDATE otp_challenges \
             SET verified = TRUE \
             WHERE id = $1 AND verified = FALSE AND expires_at > NOW() \
             RETURNING {OTP_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn purge_expired(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected())
    }
}
