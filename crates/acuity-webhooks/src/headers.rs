//! Signature extraction from request headers.
//!
//! HTTP layers hand headers over in different shapes: plain maps with
//! whatever key casing the framework chose, multi-value maps, typed header
//! maps, or an opaque accessor. [`HeaderSource`] reduces all of them to one
//! case-insensitive lookup, and [`SignatureResolver`] is written against
//! that trait only.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Header carrying the signature on Acuity static webhook deliveries.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-acuity-signature";

/// A collection of request headers.
pub trait HeaderSource {
    /// All values for `name`, matched case-insensitively, in delivery order.
    ///
    /// Returns an empty vector when the header is absent.
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>>;
}

impl<T: HeaderSource + ?Sized> HeaderSource for &T {
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        (**self).header_values(name)
    }
}

impl<S: BuildHasher> HeaderSource for HashMap<String, String, S> {
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| vec![Cow::Borrowed(value.as_str())])
            .unwrap_or_default()
    }
}

impl<S: BuildHasher> HeaderSource for HashMap<String, Vec<String>, S> {
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.iter().map(|v| Cow::Borrowed(v.as_str())).collect())
            .unwrap_or_default()
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| vec![Cow::Borrowed(value.as_str())])
            .unwrap_or_default()
    }
}

impl HeaderSource for http::HeaderMap {
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        // Opaque values stay in place as blanks so they still shadow later ones.
        self.get_all(name)
            .iter()
            .map(|value| Cow::Borrowed(value.to_str().unwrap_or_default()))
            .collect()
    }
}

/// Adapter for headers only reachable through a lookup function.
///
/// The accessor is called with the requested name first and, when that
/// yields nothing, with the lowercased name. This covers collections that
/// index only the original casing or only the lowercase form.
///
/// # Examples
///
/// ```rust
/// use acuity_webhooks::{HeaderGetter, HeaderSource};
///
/// let headers = HeaderGetter::new(|name: &str| {
///     (name == "x-acuity-signature").then(|| "abc=".to_string())
/// });
///
/// assert_eq!(headers.header_values("X-Acuity-Signature"), vec!["abc="]);
/// ```
pub struct HeaderGetter<F> {
    get: F,
}

impl<F> HeaderGetter<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Wrap an accessor function.
    pub fn new(get: F) -> Self {
        Self { get }
    }
}

impl<F> HeaderSource for HeaderGetter<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn header_values(&self, name: &str) -> Vec<Cow<'_, str>> {
        (self.get)(name)
            .or_else(|| (self.get)(&name.to_ascii_lowercase()))
            .map(|value| vec![Cow::Owned(value)])
            .unwrap_or_default()
    }
}

impl<F> std::fmt::Debug for HeaderGetter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderGetter").finish_non_exhaustive()
    }
}

/// Resolves the claimed signature for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureResolver {
    header_name: String,
}

impl SignatureResolver {
    /// Create a resolver reading `header_name`.
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }

    /// The configured signature header name.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Resolve the claimed signature.
    ///
    /// A non-blank `explicit` signature wins outright and headers are not
    /// consulted. Otherwise the first value of the configured header is
    /// used. The result is trimmed; a value that trims to nothing counts as
    /// absent.
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        headers: Option<&dyn HeaderSource>,
    ) -> Option<String> {
        if let Some(signature) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Some(signature.to_string());
        }

        let headers = headers?;
        let values = headers.header_values(&self.header_name);
        let first = values.first()?.trim();

        if first.is_empty() {
            None
        } else {
            Some(first.to_string())
        }
    }
}

impl Default for SignatureResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNATURE_HEADER)
    }
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
