//! Server-verifiable admin session tokens.
//!
//! A granted session is an HMAC-SHA256-signed assertion, not a client-held
//! boolean: `base64url(payload).base64url(mac)` where the payload is
//! `admin.<expires_unix>.<nonce>`. The server re-verifies the MAC and expiry
//! on every privileged call, so possession of the token string alone is the
//! only client-side state and tampering with any byte fails closed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

use crate::gateway::signature::secure_eq;

type HmacSha256 = Hmac<Sha256>;

const SUBJECT: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,

    #[error("session token signature mismatch")]
    SignatureMismatch,

    #[error("session expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
}

/// A freshly minted session grant.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A verified, still-valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub expires_at: DateTime<Utc>,
}

fn sign(secret: &str, payload: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Mint a new admin session token valid for `ttl_secs` from now.
pub fn mint(secret: &str, ttl_secs: i64) -> SessionGrant {
    let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs);

    let mut nonce = [0_u8; 16];
    OsRng.fill_bytes(&mut nonce);

    let payload = format!(
        "{}.{}.{}",
        SUBJECT,
        expires_at.timestamp(),
        hex::encode(nonce)
    );
    let mac = sign(secret, &payload);
    let token = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(mac)
    );

    SessionGrant { token, expires_at }
}

/// Verify a presented token: signature first, then expiry.
pub fn authorize(secret: &str, token: &str) -> Result<AdminSession, SessionError> {
    let (payload_b64, mac_b64) = token.split_once('.').ok_or(SessionError::Malformed)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Malformed)?;
    let claimed_mac = URL_SAFE_NO_PAD
        .decode(mac_b64)
        .map_err(|_| SessionError::Malformed)?;
    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Malformed)?;

    let expected_mac = sign(secret, &payload);
    if !secure_eq(&expected_mac, &claimed_mac) {
        return Err(SessionError::SignatureMismatch);
    }

    let mut parts = payload.split('.');
    let subject = parts.next().ok_or(SessionError::Malformed)?;
    let expires_raw = parts.next().ok_or(SessionError::Malformed)?;
    let _nonce = parts.next().ok_or(SessionError::Malformed)?;
    if subject != SUBJECT || parts.next().is_some() {
        return Err(SessionError::Malformed);
    }

    let expires_unix: i64 = expires_raw.parse().map_err(|_| SessionError::Malformed)?;
    let expires_at = Utc
        .timestamp_opt(expires_unix, 0)
        .single()
        .ok_or(SessionError::Malformed)?;

    if Utc::now() > expires_at {
        return Err(SessionError::Expired {
            expired_at: expires_at,
        });
    }

    Ok(AdminSession { expires_at })
}
