//! HMAC-SHA256 signature verification.
//!
//! Acuity signs each static webhook delivery with
//! `base64(HMAC-SHA256(key = api_key, message = raw_body))`. Verification
//! recomputes that value over the exact body bytes and compares it with
//! the claimed signature in constant time.

use crate::body::RawBody;
use crate::error::{WebhookError, WebhookErrorCode, WebhookResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret keying the signature digest.
///
/// The value is trimmed on construction, wiped from memory on drop, and
/// never shown in `Debug` output.
#[derive(Clone)]
pub struct WebhookSecret(Zeroizing<String>);

impl WebhookSecret {
    /// Create a secret from its raw value.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookErrorCode::InvalidPayload`] when the value is empty
    /// or only whitespace.
    pub fn new(secret: impl Into<String>) -> WebhookResult<Self> {
        let raw = Zeroizing::new(secret.into());
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WebhookError::invalid_payload(
                "Static webhook verification requires a non-empty secret.",
            ));
        }

        Ok(Self(Zeroizing::new(trimmed.to_string())))
    }

    fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"<REDACTED>").finish()
    }
}

/// Compute the base64 HMAC-SHA256 signature of `body` under `secret`.
///
/// # Errors
///
/// Returns [`WebhookErrorCode::InvalidPayload`] if the secret cannot key
/// the HMAC.
pub fn compute_signature(secret: &WebhookSecret, body: &[u8]) -> WebhookResult<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.expose()).map_err(|_| {
        WebhookError::invalid_payload("Webhook secret cannot be used as an HMAC key.")
    })?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Compare two signatures without leaking where they diverge.
///
/// Signatures of unequal length are reported unequal immediately; their
/// lengths are public (every valid signature has the same length). Equal
/// lengths are compared over every byte regardless of earlier mismatches.
pub fn constant_time_eq(expected: &str, claimed: &str) -> bool {
    let expected = expected.as_bytes();
    let claimed = claimed.as_bytes();

    if expected.len() != claimed.len() {
        return false;
    }

    expected.ct_eq(claimed).into()
}

/// Verifies claimed signatures against a fixed secret.
///
/// [`SignatureVerifier::verify_or_fail`] is the single verification
/// primitive; the boolean form is derived from it.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
}

impl SignatureVerifier {
    /// Create a verifier for `secret`.
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Expected signature for `body`.
    pub fn expected_signature(&self, body: &[u8]) -> WebhookResult<String> {
        compute_signature(&self.secret, body)
    }

    /// Verify a claimed signature, failing with a typed error.
    ///
    /// # Errors
    ///
    /// - [`WebhookErrorCode::SignatureMissing`] when `claimed` is `None`
    /// - [`WebhookErrorCode::SignatureMismatch`] when it does not match
    /// - [`WebhookErrorCode::InvalidPayload`] when the secret cannot key the HMAC
    #[instrument(
        skip(self, body, claimed),
        fields(body_len = body.len(), sig_len = claimed.map(str::len))
    )]
    pub fn verify_or_fail(&self, body: &[u8], claimed: Option<&str>) -> WebhookResult<()> {
        let claimed = claimed.ok_or_else(|| {
            WebhookError::from_code(WebhookErrorCode::SignatureMissing)
        })?;

        let expected = Zeroizing::new(self.expected_signature(body)?);
        if constant_time_eq(&expected, claimed) {
            debug!("Webhook signature matches");
            Ok(())
        } else {
            debug!("Webhook signature does not match");
            Err(WebhookError::signature_mismatch())
        }
    }

    /// Verify a claimed signature. A missing signature is simply invalid.
    pub fn verify(&self, body: &[u8], claimed: Option<&str>) -> bool {
        self.verify_or_fail(body, claimed).is_ok()
    }
}

/// Check a delivery's signature with a one-off secret.
///
/// Returns `Ok(false)` for a missing or mismatched signature.
///
/// # Errors
///
/// Returns [`WebhookErrorCode::InvalidPayload`] when `secret` is blank;
/// verification never silently passes without a key.
///
/// # Examples
///
/// ```rust
/// use acuity_webhooks::{compute_signature, verify_signature, WebhookSecret};
///
/// let body = "action=scheduled&id=42";
/// let signature = compute_signature(&WebhookSecret::new("s3cr3t")?, body.as_bytes())?;
///
/// assert!(verify_signature("s3cr3t", body, Some(&signature))?);
/// assert!(!verify_signature("s3cr3t", "action=canceled&id=42", Some(&signature))?);
/// # Ok::<(), acuity_webhooks::WebhookError>(())
/// ```
pub fn verify_signature<'a>(
    secret: &str,
    body: impl Into<RawBody<'a>>,
    claimed: Option<&str>,
) -> WebhookResult<bool> {
    let verifier = SignatureVerifier::new(WebhookSecret::new(secret)?);
    let body = body.into();
    Ok(verifier.verify(body.normalize(), claimed))
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
