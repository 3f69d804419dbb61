//! Common test utilities for acuity-webhooks integration tests
//!
//! This module provides:
//! - A recording handler standing in for application event processing
//! - Helpers for signing bodies and building header collections

use acuity_webhooks::{
    compute_signature, DecodedEvent, StaticWebhookConfig, StaticWebhookHandler, WebhookError,
    WebhookHandler, WebhookSecret,
};
use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "s3cr3t";

// ============================================================================
// Recording Handler
// ============================================================================

/// Records every event it receives; optionally fails after recording.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<DecodedEvent>>>,
    failure: Option<String>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            events: Arc::default(),
            failure: Some(message.into()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<DecodedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookHandler for RecordingHandler {
    type Error = anyhow::Error;

    async fn handle_event(&self, event: &DecodedEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());

        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Handler verifying with [`SECRET`] and the default header.
#[allow(dead_code)]
pub fn verifying_handler() -> StaticWebhookHandler {
    StaticWebhookHandler::new(StaticWebhookConfig::with_secret(SECRET))
        .expect("valid handler configuration")
}

/// Signature of `body` under [`SECRET`].
#[allow(dead_code)]
pub fn sign(body: &[u8]) -> String {
    sign_with(SECRET, body)
}

#[allow(dead_code)]
pub fn sign_with(secret: &str, body: &[u8]) -> String {
    let secret = WebhookSecret::new(secret).expect("non-blank secret");
    compute_signature(&secret, body).expect("signature computes")
}

/// Header map as an HTTP server would hand it over.
#[allow(dead_code)]
pub fn signed_header_map(header_name: &'static str, body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "content-type",
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(
        header_name,
        HeaderValue::from_str(&sign(body)).expect("base64 is a valid header value"),
    );
    headers
}

/// Recover the webhook error from a handler result, if that is what failed.
#[allow(dead_code)]
pub fn webhook_error<T: std::fmt::Debug>(result: anyhow::Result<T>) -> WebhookError {
    result
        .expect_err("expected a failure")
        .downcast::<WebhookError>()
        .expect("failure is a webhook error")
}
