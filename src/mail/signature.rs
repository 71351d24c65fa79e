//! Webhook signature verification.
//!
//! The provider signs each webhook with `HMAC-SHA256(signing_key, timestamp ‖ token)`
//! and sends the hex digest alongside the timestamp and token.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::types::WebhookSignature;
use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Checks webhook signatures against the provider signing key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    signing_key: SecretString,
    max_age: Duration,
}

impl SignatureVerifier {
    pub fn new(signing_key: SecretString, max_age: Duration) -> Self {
        Self {
            signing_key,
            max_age,
        }
    }

    /// Verify a signature against the current wall clock.
    pub fn verify(&self, signature: Option<&WebhookSignature>) -> Result<(), WebhookError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.verify_at(signature, now)
    }

    /// Verify a signature as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        signature: Option<&WebhookSignature>,
        now: u64,
    ) -> Result<(), WebhookError> {
        let sig = signature.ok_or(WebhookError::MissingSignature)?;

        let stale = || WebhookError::StaleTimestamp {
            timestamp: sig.timestamp.as_signed_text(),
        };
        let sent_at = sig.timestamp.as_secs().ok_or_else(stale)?;
        if now.abs_diff(sent_at) > self.max_age.as_secs() {
            return Err(stale());
        }

        let digest = hex::decode(sig.signature.trim()).map_err(|_| WebhookError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.signing_key.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(sig.timestamp.as_signed_text().as_bytes());
        mac.update(sig.token.as_bytes());

        // Constant-time comparison
        mac.verify_slice(&digest)
            .map_err(|_| WebhookError::InvalidSignature)
    }
}
