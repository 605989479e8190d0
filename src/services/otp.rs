//! One-time-code issuance and validation for the admin identity.
//!
//! Codes are 6 digits drawn uniformly from the OS CSPRNG. A 10^6 code space
//! is a weak secret on its own; it stays safe only because codes are
//! short-lived, single-use, and the HTTP edge throttles validation attempts
//! per subject (a deployment requirement, not an internal retry loop).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{info, warn};

use crate::database::store::OtpStore;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::gateway::signature::secure_eq;

/// A freshly issued code, returned for out-of-band delivery.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OtpEngine {
    store: Arc<dyn OtpStore>,
    ttl_secs: i64,
}

impl OtpEngine {
    pub fn new(store: Arc<dyn OtpStore>, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }

    /// Uniform over the full 6-digit space, never derived from counters or
    /// timestamps.
    pub fn generate_code() -> String {
        format!("{:06}", OsRng.gen_range(0..1_000_000_u32))
    }

    fn normalize(subject_email: &str) -> String {
        subject_email.trim().to_lowercase()
    }

    /// Issue a fresh code for the subject, superseding any prior unconsumed
    /// one.
    pub async fn issue(&self, subject_email: &str) -> AppResult<IssuedOtp> {
        let subject = Self::normalize(subject_email);
        let code = Self::generate_code();
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs);

        let challenge = self.store.replace(&subject, &code, expires_at).await?;
        info!(
            subject = %challenge.subject_email,
            expires_at = %challenge.expires_at,
            "OTP challenge issued"
        );

        Ok(IssuedOtp {
            code,
            expires_at: challenge.expires_at,
        })
    }

    /// Validate a submitted code. Success consumes the challenge: a second
    /// validation with the same code fails as not-found.
    pub async fn validate(&self, subject_email: &str, submitted_code: &str) -> AppResult<()> {
        let subject = Self::normalize(subject_email);

        let challenge = self
            .store
            .latest_unverified(&subject)
            .await?
            .ok_or_else(|| {
                warn!(subject = %subject, "OTP validation: no live challenge");
                AppError::new(AppErrorKind::Domain(DomainError::OtpNotFound {
                    subject: subject.clone(),
                }))
            })?;

        if Utc::now() > challenge.expires_at {
            warn!(subject = %subject, expired_at = %challenge.expires_at, "OTP validation: challenge expired");
            return Err(AppError::new(AppErrorKind::Domain(DomainError::OtpExpired {
                subject,
            })));
        }

        if !secure_eq(challenge.code.as_bytes(), submitted_code.trim().as_bytes()) {
            warn!(subject = %subject, "OTP validation: code mismatch");
            return Err(AppError::new(AppErrorKind::Domain(
                DomainError::OtpMismatch { subject },
            )));
        }

        // A concurrent validation of the same code races on this conditional
        // update; exactly one caller wins it.
        let consumed = self.store.consume(challenge.id).await?;
        if consumed.is_none() {
            warn!(subject = %subject, "OTP validation: challenge already consumed");
            return Err(AppError::new(AppErrorKind::Domain(DomainError::OtpNotFound {
                subject,
            })));
        }

        info!(subject = %subject, "OTP challenge consumed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..64 {
            let code = OtpEngine::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn subjects_are_normalized() {
        assert_eq!(
            OtpEngine::normalize("  Admin@Example.COM "),
            "admin@example.com"
        );
    }
}
