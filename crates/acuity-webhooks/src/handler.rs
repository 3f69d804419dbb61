//! Verify-then-decode-then-dispatch handling of static webhook deliveries.
//!
//! [`StaticWebhookHandler`] ties the pieces together for an integrating
//! application:
//!
//! 1. Resolve the claimed signature (explicit value or header)
//! 2. Verify it against the body with the configured secret
//! 3. Decode the body into a [`DecodedEvent`]
//! 4. Invoke the application's callback and await it
//! 5. Return the event
//!
//! Verification strictly precedes decoding: an unauthenticated body is
//! never parsed into a [`DecodedEvent`] or handed to a callback. Callback
//! errors are returned unchanged.
//!
//! # Examples
//!
//! ```rust
//! use acuity_webhooks::{
//!     compute_signature, DecodedEvent, StaticWebhookConfig, StaticWebhookHandler,
//!     WebhookError, WebhookHandler, WebhookRequest, WebhookSecret,
//! };
//! use async_trait::async_trait;
//! use std::collections::HashMap;
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl WebhookHandler for PrintHandler {
//!     type Error = WebhookError;
//!
//!     async fn handle_event(&self, event: &DecodedEvent) -> Result<(), WebhookError> {
//!         println!("{} {}", event.event_type, event.id);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), WebhookError> {
//! let handler = StaticWebhookHandler::new(StaticWebhookConfig::with_secret("s3cr3t"))?;
//!
//! let body = "action=canceled&id=9";
//! let signature = compute_signature(&WebhookSecret::new("s3cr3t")?, body.as_bytes())?;
//! let headers = HashMap::from([("X-Acuity-Signature".to_string(), signature)]);
//!
//! let request = WebhookRequest::new(body).with_headers(&headers);
//! let event = handler.handle(request, &PrintHandler).await?;
//! assert_eq!(event.id, 9);
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```

use crate::body::{decode_text, RawBody};
use crate::error::{WebhookError, WebhookResult};
use crate::event::{decode_event, DecodedEvent};
use crate::headers::{HeaderSource, SignatureResolver, DEFAULT_SIGNATURE_HEADER};
use crate::signature::{SignatureVerifier, WebhookSecret};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, instrument, warn, Span};

// ============================================================================
// Configuration
// ============================================================================

fn default_verify() -> bool {
    true
}

/// Configuration for a [`StaticWebhookHandler`].
///
/// Deserializable so it can be embedded in an application's own settings.
/// `verify` defaults to `true`; turning it off is meant for local and test
/// integrations only.
#[derive(Clone, Deserialize)]
pub struct StaticWebhookConfig {
    /// API key used to sign deliveries. Required while `verify` is on.
    #[serde(default)]
    pub secret: Option<String>,

    /// Signature header name. Defaults to `x-acuity-signature`.
    #[serde(default)]
    pub header_name: Option<String>,

    /// Reject deliveries whose signature is missing or wrong.
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl StaticWebhookConfig {
    /// Verifying configuration for `secret` with the default header.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// Override the signature header name.
    pub fn header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = Some(header_name.into());
        self
    }

    /// Disable signature verification.
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }
}

impl Default for StaticWebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            header_name: None,
            verify: default_verify(),
        }
    }
}

impl fmt::Debug for StaticWebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticWebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .field("header_name", &self.header_name)
            .field("verify", &self.verify)
            .finish()
    }
}

// ============================================================================
// Request
// ============================================================================

/// One inbound delivery as handed over by the HTTP layer.
///
/// The body must be the exact bytes received; re-serialized bodies do not
/// verify.
pub struct WebhookRequest<'a> {
    body: RawBody<'a>,
    headers: Option<&'a (dyn HeaderSource + Sync)>,
    signature: Option<&'a str>,
}

impl<'a> WebhookRequest<'a> {
    /// Create a request carrying only a body.
    pub fn new(body: impl Into<RawBody<'a>>) -> Self {
        Self {
            body: body.into(),
            headers: None,
            signature: None,
        }
    }

    /// Attach the request headers.
    pub fn with_headers(mut self, headers: &'a (dyn HeaderSource + Sync)) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Attach a signature the caller already extracted. It takes precedence
    /// over headers when non-blank.
    pub fn with_signature(mut self, signature: &'a str) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn body(&self) -> &RawBody<'a> {
        &self.body
    }
}

impl fmt::Debug for WebhookRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRequest")
            .field("body_len", &self.body.len())
            .field("has_headers", &self.headers.is_some())
            .field("has_signature", &self.signature.is_some())
            .finish()
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// Application-provided processing for decoded events.
///
/// Failures of the webhook pipeline itself convert into `Self::Error`, so a
/// single error type flows back from [`StaticWebhookHandler::handle`] while
/// the handler's own errors pass through untouched.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Error returned by the handler and by the surrounding pipeline.
    type Error: From<WebhookError> + Send;

    /// Process one authenticated event.
    async fn handle_event(&self, event: &DecodedEvent) -> Result<(), Self::Error>;
}

// ============================================================================
// Handling stages
// ============================================================================

/// Progress of a single `handle` call, reported in tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStage {
    Idle,
    SignatureResolved,
    Verified,
    Decoded,
    Rejected,
}

impl HandleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SignatureResolved => "signature_resolved",
            Self::Verified => "verified",
            Self::Decoded => "decoded",
            Self::Rejected => "rejected",
        }
    }

    /// True for `Decoded` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Decoded | Self::Rejected)
    }
}

impl fmt::Display for HandleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter_stage(stage: HandleStage) {
    Span::current().record("stage", stage.as_str());
    debug!(stage = %stage, "Webhook handling stage reached");
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Authenticates, decodes and dispatches static webhook deliveries.
///
/// Configuration is validated once at construction. The handler holds only
/// read-only state and can be shared across concurrent requests behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct StaticWebhookHandler {
    resolver: SignatureResolver,
    verifier: Option<SignatureVerifier>,
}

impl StaticWebhookHandler {
    /// Build a handler from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookErrorCode::InvalidPayload`] when verification is on
    /// and the secret is absent or blank, or when the header name override
    /// is blank.
    ///
    /// [`WebhookErrorCode::InvalidPayload`]: crate::WebhookErrorCode::InvalidPayload
    pub fn new(config: StaticWebhookConfig) -> WebhookResult<Self> {
        let header_name = match config.header_name.as_deref().map(str::trim) {
            Some("") => {
                return Err(WebhookError::invalid_payload(
                    "Static webhook signature header name must not be blank.",
                ))
            }
            Some(name) => name.to_string(),
            None => DEFAULT_SIGNATURE_HEADER.to_string(),
        };

        let verifier = if config.verify {
            let secret = config.secret.unwrap_or_default();
            let secret = WebhookSecret::new(secret).map_err(|_| {
                WebhookError::invalid_payload(
                    "Static webhook secret is required to verify requests.",
                )
            })?;
            Some(SignatureVerifier::new(secret))
        } else {
            warn!(
                header_name = %header_name,
                "Static webhook signature verification is DISABLED; \
                 deliveries are accepted without authentication"
            );
            None
        };

        Ok(Self {
            resolver: SignatureResolver::new(header_name),
            verifier,
        })
    }

    /// The signature header this handler reads.
    pub fn header_name(&self) -> &str {
        self.resolver.header_name()
    }

    /// Whether deliveries are rejected on missing or wrong signatures.
    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }

    /// Check only the signature of a request.
    ///
    /// Always succeeds when verification is disabled.
    ///
    /// # Errors
    ///
    /// - `SignatureMissing` when no signature could be resolved
    /// - `SignatureMismatch` when the signature does not match the body
    pub fn verify_request(&self, request: &WebhookRequest<'_>) -> WebhookResult<()> {
        let Some(verifier) = &self.verifier else {
            return Ok(());
        };

        let signature = self.resolve(request);
        self.check_signature(verifier, request, signature.as_deref())
    }

    /// Resolve, verify and decode a request without invoking any callback.
    ///
    /// # Errors
    ///
    /// - `SignatureMissing` / `SignatureMismatch` from verification
    /// - `InvalidPayload` from decoding
    #[instrument(
        skip(self, request),
        fields(body_len = request.body().len(), stage = HandleStage::Idle.as_str())
    )]
    pub fn authenticate(&self, request: WebhookRequest<'_>) -> WebhookResult<DecodedEvent> {
        let result = self.authenticate_inner(&request);
        if let Err(e) = &result {
            enter_stage(HandleStage::Rejected);
            warn!(
                code = %e.code(),
                error = %e,
                "Static webhook delivery rejected"
            );
        }
        result
    }

    /// Handle a delivery with a [`WebhookHandler`].
    ///
    /// The handler runs exactly once, only after the delivery has been
    /// verified and decoded, and is awaited before this returns.
    ///
    /// # Errors
    ///
    /// Pipeline failures converted into `H::Error`, or the handler's own
    /// error unchanged.
    pub async fn handle<H>(
        &self,
        request: WebhookRequest<'_>,
        handler: &H,
    ) -> Result<DecodedEvent, H::Error>
    where
        H: WebhookHandler + ?Sized,
    {
        let event = self.authenticate(request)?;
        handler.handle_event(&event).await?;
        Ok(event)
    }

    /// Handle a delivery with a closure callback.
    ///
    /// The callback receives its own copy of the event; synchronous
    /// callbacks can return `std::future::ready(..)`.
    ///
    /// # Errors
    ///
    /// Pipeline failures converted into `E`, or the callback's own error
    /// unchanged.
    pub async fn handle_with<F, Fut, E>(
        &self,
        request: WebhookRequest<'_>,
        callback: F,
    ) -> Result<DecodedEvent, E>
    where
        F: FnOnce(DecodedEvent) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<WebhookError>,
    {
        let event = self.authenticate(request)?;
        callback(event.clone()).await?;
        Ok(event)
    }

    fn resolve(&self, request: &WebhookRequest<'_>) -> Option<String> {
        let headers = request.headers.map(|h| h as &dyn HeaderSource);
        self.resolver.resolve(request.signature, headers)
    }

    fn check_signature(
        &self,
        verifier: &SignatureVerifier,
        request: &WebhookRequest<'_>,
        signature: Option<&str>,
    ) -> WebhookResult<()> {
        if signature.is_none() {
            return Err(WebhookError::signature_missing(format!(
                "Missing \"{}\" header on static webhook request.",
                self.header_name()
            )));
        }

        verifier.verify_or_fail(request.body.normalize(), signature)
    }

    fn authenticate_inner(&self, request: &WebhookRequest<'_>) -> WebhookResult<DecodedEvent> {
        let signature = self.resolve(request);
        if signature.is_some() {
            enter_stage(HandleStage::SignatureResolved);
        }

        match &self.verifier {
            Some(verifier) => {
                self.check_signature(verifier, request, signature.as_deref())?;
                enter_stage(HandleStage::Verified);
            }
            None => {
                debug!(
                    signature_present = signature.is_some(),
                    "Skipping signature verification"
                );
            }
        }

        let text = decode_text(request.body.normalize());
        let event = decode_event(&text)?;
        enter_stage(HandleStage::Decoded);

        info!(
            event_type = %event.event_type,
            appointment_id = event.id,
            calendar_id = ?event.calendar_id,
            "Static webhook event accepted"
        );

        Ok(event)
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
