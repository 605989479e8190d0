//! Two-factor admin authentication.
//!
//! A static password alone is a long-lived secret that can leak through
//! logs, repo history or phishing; access additionally requires a fresh
//! short-TTL single-use code delivered out of band, so a leaked password
//! cannot grant a session by itself.

use tracing::{info, warn};

use crate::auth::session::{self, AdminSession, SessionGrant};
use crate::config::AdminConfig;
use crate::error::{AppError, AppResult};
use crate::gateway::signature::secure_eq;
use crate::services::notification::NotificationService;
use crate::services::otp::OtpEngine;

#[derive(Clone)]
pub struct AdminAuthService {
    otp: OtpEngine,
    notifier: NotificationService,
    config: AdminConfig,
}

impl AdminAuthService {
    pub fn new(otp: OtpEngine, notifier: NotificationService, config: AdminConfig) -> Self {
        Self {
            otp,
            notifier,
            config,
        }
    }

    /// First factor. On a password match an OTP challenge is issued for the
    /// admin identity and handed to the notifier; the response never reveals
    /// how close the attempt was.
    pub async fn login(&self, password: &str) -> AppResult<()> {
        if !secure_eq(password.as_bytes(), self.config.password.as_bytes()) {
            warn!("admin login rejected");
            return Err(AppError::unauthorized());
        }

        let issued = self.otp.issue(&self.config.admin_email).await?;
        self.notifier
            .otp_code(&self.config.admin_email, &issued.code, issued.expires_at);
        info!("admin password accepted, OTP challenge issued");
        Ok(())
    }

    /// Second factor. A consumed challenge mints a signed session token with
    /// its own expiry. The precise OTP failure reason is logged server-side
    /// only; callers see a generic unauthorized.
    pub async fn verify(&self, code: &str) -> AppResult<SessionGrant> {
        if let Err(err) = self.otp.validate(&self.config.admin_email, code).await {
            warn!(reason = ?err.kind, "admin OTP verification failed");
            return Err(AppError::unauthorized());
        }

        let grant = session::mint(&self.config.session_secret, self.config.session_ttl_secs);
        info!(expires_at = %grant.expires_at, "admin session granted");
        Ok(grant)
    }

    /// Check a presented session token before a privileged operation.
    pub fn authorize(&self, token: &str) -> AppResult<AdminSession> {
        session::authorize(&self.config.session_secret, token).map_err(|err| {
            warn!(reason = %err, "admin session rejected");
            AppError::unauthorized()
        })
    }
}
