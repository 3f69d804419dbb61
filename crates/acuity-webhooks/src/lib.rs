//! # Acuity Webhooks
//!
//! Authentication and decoding of Acuity Scheduling static webhook
//! deliveries.
//!
//! This crate provides:
//! - Body normalization over text, owned buffers and buffer windows
//! - Signature resolution from an explicit value or any header collection
//! - HMAC-SHA256 verification with constant-time comparison
//! - Decoding of form-encoded appointment events
//! - A verify-then-decode-then-dispatch handler for integrating applications
//!
//! Receiving the HTTP request, persisting events, and reacting to them are
//! left to the application.
//!
//! # Security
//!
//! Signatures are compared in constant time. Secrets are wiped on drop and
//! never appear in `Debug` output or logs, and mismatch errors never carry
//! the expected signature.
//!
//! # Examples
//!
//! ```rust
//! use acuity_webhooks::{
//!     compute_signature, StaticWebhookConfig, StaticWebhookHandler, WebhookErrorCode,
//!     WebhookRequest, WebhookSecret,
//! };
//! use std::collections::HashMap;
//!
//! let handler = StaticWebhookHandler::new(StaticWebhookConfig::with_secret("s3cr3t"))?;
//!
//! let body = "action=scheduled&id=42&calendarID=7";
//! let signature = compute_signature(&WebhookSecret::new("s3cr3t")?, body.as_bytes())?;
//! let headers = HashMap::from([("x-acuity-signature".to_string(), signature)]);
//!
//! let event = handler.authenticate(WebhookRequest::new(body).with_headers(&headers))?;
//! assert_eq!(event.event_type.as_str(), "appointment.scheduled");
//! assert_eq!(event.calendar_id, Some(7));
//!
//! let unsigned = handler.authenticate(WebhookRequest::new(body)).unwrap_err();
//! assert_eq!(unsigned.code(), WebhookErrorCode::SignatureMissing);
//! # Ok::<(), acuity_webhooks::WebhookError>(())
//! ```

pub mod body;
pub mod error;
pub mod event;
pub mod handler;
pub mod headers;
pub mod signature;

// Re-export commonly used types at crate root for convenience
pub use body::{decode_text, BodyView, RawBody};
pub use error::{WebhookError, WebhookErrorCode, WebhookResult};
pub use event::{
    decode_event, parse_optional_numeric, parse_required_numeric, AppointmentAction,
    DecodedEvent, EventScope, EventType,
};
pub use handler::{
    HandleStage, StaticWebhookConfig, StaticWebhookHandler, WebhookHandler, WebhookRequest,
};
pub use headers::{HeaderGetter, HeaderSource, SignatureResolver, DEFAULT_SIGNATURE_HEADER};
pub use signature::{
    compute_signature, constant_time_eq, verify_signature, SignatureVerifier, WebhookSecret,
};
