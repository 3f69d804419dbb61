//! Error types for webhook verification and decoding.
//!
//! Every failure in this crate is a [`WebhookError`]: a single error type
//! discriminated by a [`WebhookErrorCode`]. Integrators match on the code
//! rather than on a hierarchy of error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Discriminating code carried by every [`WebhookError`].
///
/// The serialized form is stable and matches [`WebhookErrorCode::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookErrorCode {
    /// Secret misconfigured, body malformed, required field missing or
    /// unparseable, or action not recognized.
    InvalidPayload,

    /// No claimed signature could be resolved from the request.
    SignatureMissing,

    /// The claimed signature does not match the computed one.
    SignatureMismatch,

    /// The raw body could not be interpreted as a byte sequence.
    UnsupportedBodyType,
}

impl WebhookErrorCode {
    /// Wire form of the code (`invalid_payload`, `signature_missing`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::SignatureMissing => "signature_missing",
            Self::SignatureMismatch => "signature_mismatch",
            Self::UnsupportedBodyType => "unsupported_body_type",
        }
    }

    /// Message used when an error is raised without a specific one.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "Webhook payload is invalid.",
            Self::SignatureMissing => "Webhook signature header is missing.",
            Self::SignatureMismatch => "Webhook signature verification failed.",
            Self::UnsupportedBodyType => "Unsupported webhook body type.",
        }
    }
}

impl fmt::Display for WebhookErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A webhook verification or decoding failure.
///
/// Messages for [`WebhookErrorCode::SignatureMismatch`] never contain the
/// expected or the claimed signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WebhookError {
    code: WebhookErrorCode,
    message: String,
}

impl WebhookError {
    /// Create an error with an explicit message.
    pub fn new(code: WebhookErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error carrying the default message for `code`.
    pub fn from_code(code: WebhookErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Shorthand for an [`WebhookErrorCode::InvalidPayload`] error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(WebhookErrorCode::InvalidPayload, message)
    }

    /// Shorthand for a [`WebhookErrorCode::SignatureMissing`] error.
    pub fn signature_missing(message: impl Into<String>) -> Self {
        Self::new(WebhookErrorCode::SignatureMissing, message)
    }

    /// A [`WebhookErrorCode::SignatureMismatch`] error. Takes no message so
    /// no caller can leak signature material through it.
    pub fn signature_mismatch() -> Self {
        Self::from_code(WebhookErrorCode::SignatureMismatch)
    }

    /// Shorthand for an [`WebhookErrorCode::UnsupportedBodyType`] error.
    pub fn unsupported_body_type(message: impl Into<String>) -> Self {
        Self::new(WebhookErrorCode::UnsupportedBodyType, message)
    }

    /// The discriminating code.
    pub fn code(&self) -> WebhookErrorCode {
        self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for missing or mismatched signatures.
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self.code,
            WebhookErrorCode::SignatureMissing | WebhookErrorCode::SignatureMismatch
        )
    }

    /// HTTP status an integrator should answer the delivery with.
    ///
    /// Signature failures map to `401`, everything else to `400`. A non-2xx
    /// answer lets the delivering system apply its own redelivery policy.
    pub fn status_code(&self) -> u16 {
        if self.is_signature_failure() {
            401
        } else {
            400
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Always `false`: every failure here is a pure function of the input.
    pub fn is_transient(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
