//! Webhook signature verification.
//!
//! Deliveries are signed with HMAC-SHA256 over the raw request body, keyed by
//! the shared webhook secret, and sent as `X-Hub-Signature-256: sha256=<hex>`.
//! Verification must run over the untouched body bytes, before any JSON
//! parsing.

use crate::settings::WebhookSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Literal prefix of every valid signature header.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifies `X-Hub-Signature-256` headers against the shared secret.
///
/// # Examples
///
/// ```rust
/// use webhook_ledger_core::{sign, SignatureVerifier, WebhookSecret};
///
/// let secret = WebhookSecret::new("my-secret");
/// let body = br#"{"zen":"Keep it logically awesome."}"#;
/// let header = sign(&secret, body);
///
/// let verifier = SignatureVerifier::new(secret);
/// assert!(verifier.verify(body, Some(&header)));
/// assert!(!verifier.verify(body, None));
/// ```
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
}

impl SignatureVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Check whether `signature_header` authenticates `body`.
    ///
    /// Returns `false` when the header is absent or empty, lacks the
    /// `sha256=` prefix, when the secret is empty, or when the digest does not
    /// match. The digest comparison is constant time.
    pub fn verify(&self, body: &[u8], signature_header: Option<&str>) -> bool {
        let header = match signature_header {
            Some(h) if !h.is_empty() => h,
            _ => {
                debug!("Signature header missing");
                return false;
            }
        };

        let Some(provided_hex) = header.strip_prefix(SIGNATURE_PREFIX) else {
            debug!("Signature header lacks sha256= prefix");
            return false;
        };

        if self.secret.is_empty() {
            debug!("Webhook secret is empty; rejecting all signatures");
            return false;
        }

        let Some(expected_hex) = hex_digest(&self.secret, body) else {
            return false;
        };

        let matches: bool = expected_hex
            .as_bytes()
            .ct_eq(provided_hex.as_bytes())
            .into();
        if !matches {
            debug!("Signature digest mismatch");
        }
        matches
    }
}

/// Compute the `sha256=<hex>` header value for `body` under `secret`.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> String {
    // HMAC accepts keys of any length, including empty ones.
    let digest = hex_digest(secret, body).unwrap_or_default();
    format!("{}{}", SIGNATURE_PREFIX, digest)
}

fn hex_digest(secret: &WebhookSecret, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
