//! Payment confirmation signatures.
//!
//! The gateway signs each captured payment as
//! `HMAC-SHA256(key_secret, "{gateway_order_id}|{gateway_payment_id}")`,
//! hex-encoded. Recomputing that MAC with the shared secret and comparing in
//! constant time is the single trust boundary before an order may be marked
//! paid; a client-supplied "payment succeeded" flag is never trusted on its
//! own.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the expected hex signature for an order/payment pair.
pub fn payment_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    key_secret: &str,
) -> String {
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a claimed signature for an order/payment pair.
pub fn verify_payment_signature(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> bool {
    let expected = payment_signature(gateway_order_id, gateway_payment_id, key_secret);
    secure_eq(expected.as_bytes(), signature.trim().as_bytes())
}

/// Constant-time byte comparison used for every secret check in the crate
/// (payment signatures, OTP codes, admin password, session MACs).
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = payment_signature("order_123", "pay_456", "secret");
        assert!(verify_payment_signature("order_123", "pay_456", &sig, "secret"));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = payment_signature("order_123", "pay_456", "secret");
        assert!(!verify_payment_signature(
            "order_123",
            "pay_456",
            &sig,
            "other-secret"
        ));
    }

    #[test]
    fn tampered_payment_id_fails() {
        let sig = payment_signature("order_123", "pay_456", "secret");
        assert!(!verify_payment_signature(
            "order_123",
            "pay_999",
            &sig,
            "secret"
        ));
    }

    #[test]
    fn signature_replayed_from_other_order_fails() {
        let sig = payment_signature("order_aaa", "pay_456", "secret");
        assert!(!verify_payment_signature(
            "order_bbb",
            "pay_456",
            &sig,
            "secret"
        ));
    }

    #[test]
    fn surrounding_whitespace_in_header_value_is_tolerated() {
        let sig = payment_signature("order_123", "pay_456", "secret");
        let padded = format!(" {sig} ");
        assert!(verify_payment_signature(
            "order_123",
            "pay_456",
            &padded,
            "secret"
        ));
    }
}
