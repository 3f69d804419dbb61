//! Raw request body normalization.
//!
//! Signatures are computed over the exact bytes the provider sent, so the
//! body must reach this crate unmodified. [`RawBody`] accepts the shapes an
//! HTTP layer typically hands over (text, an owned buffer, or a window into
//! a larger buffer) and exposes them as one canonical byte slice.

use crate::error::{WebhookError, WebhookResult};
use bytes::Bytes;
use std::borrow::Cow;
use tracing::warn;

/// A bounded window into a larger byte buffer.
///
/// Only the bytes inside `[offset, offset + length)` are ever exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyView<'a> {
    window: &'a [u8],
}

impl<'a> BodyView<'a> {
    /// Create a view over `length` bytes of `buffer` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookErrorCode::UnsupportedBodyType`] when the window
    /// does not fit inside `buffer`.
    ///
    /// [`WebhookErrorCode::UnsupportedBodyType`]: crate::WebhookErrorCode::UnsupportedBodyType
    pub fn new(buffer: &'a [u8], offset: usize, length: usize) -> WebhookResult<Self> {
        let end = offset.checked_add(length).filter(|end| *end <= buffer.len());

        match end {
            Some(end) => Ok(Self {
                window: &buffer[offset..end],
            }),
            None => Err(WebhookError::unsupported_body_type(format!(
                "Body view (offset {}, length {}) exceeds buffer of {} bytes.",
                offset,
                length,
                buffer.len()
            ))),
        }
    }

    /// The bytes inside the window.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.window
    }
}

/// A webhook request body in any of its equivalent encodings.
///
/// Two bodies carrying the same logical bytes normalize identically,
/// whatever variant they arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody<'a> {
    /// Text, encoded as UTF-8.
    Text(Cow<'a, str>),
    /// An owned byte buffer.
    Buffer(Bytes),
    /// A window into a borrowed buffer.
    View(BodyView<'a>),
}

impl RawBody<'_> {
    /// Canonical bytes of the body.
    pub fn normalize(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Buffer(buffer) => buffer,
            Self::View(view) => view.as_bytes(),
        }
    }

    /// Number of canonical bytes.
    pub fn len(&self) -> usize {
        self.normalize().len()
    }

    /// True when the body carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a str> for RawBody<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for RawBody<'_> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a [u8]> for RawBody<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::View(BodyView { window: bytes })
    }
}

impl From<Vec<u8>> for RawBody<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(bytes))
    }
}

impl From<Bytes> for RawBody<'_> {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl<'a> From<BodyView<'a>> for RawBody<'a> {
    fn from(view: BodyView<'a>) -> Self {
        Self::View(view)
    }
}

/// Decode normalized body bytes as UTF-8 text for parsing.
///
/// Invalid sequences are replaced with U+FFFD rather than rejected; the
/// form decoder rejects whatever content this leaves malformed.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        warn!(
            body_len = bytes.len(),
            "Webhook body is not valid UTF-8; decoded lossily"
        );
    }
    text
}

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;
