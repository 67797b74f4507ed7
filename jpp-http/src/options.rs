//! Connection and per-request options.
//!
//! [`ClientOptions`] is fixed when the client is built. [`RequestOptions`]
//! adjust a single call and are layered on top with
//! [`ClientOptions::layered`]; neither is mutated by the merge.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};

/// Options fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    verify_tls: bool,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }
}

impl ClientOptions {
    /// Creates options that verify TLS certificates and send no extra headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Sends `name: value` with every request, e.g. a partner identifier.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the default headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets a default timeout for every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns `true` if TLS certificates are verified.
    #[must_use]
    pub const fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Returns the default headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the default timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Merges per-request options over these defaults.
    ///
    /// Request headers replace default headers of the same name; all other
    /// defaults are kept. A request timeout replaces the default timeout.
    #[must_use]
    pub fn layered(&self, request: &RequestOptions) -> EffectiveOptions {
        let mut headers = self.headers.clone();
        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }
        EffectiveOptions {
            headers,
            timeout: request.timeout.or(self.timeout),
        }
    }
}

/// Options for a single call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates empty per-request options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to this request.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the timeout of this request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The options actually applied to an outbound request.
#[derive(Debug, Clone)]
pub struct EffectiveOptions {
    /// Headers sent before the protocol headers.
    pub headers: HeaderMap,
    /// Request timeout, if any.
    pub timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layering_merges_headers() {
        let client = ClientOptions::new()
            .with_header(
                HeaderName::from_static("x-partner"),
                HeaderValue::from_static("acme"),
            )
            .with_header(
                HeaderName::from_static("x-partner-version"),
                HeaderValue::from_static("1"),
            )
            .with_timeout(Duration::from_secs(30));
        let request = RequestOptions::new().with_header(
            HeaderName::from_static("x-partner-version"),
            HeaderValue::from_static("2"),
        );

        let effective = client.layered(&request);
        assert_eq!(effective.headers["x-partner"], "acme");
        assert_eq!(effective.headers["x-partner-version"], "2");
        assert_eq!(effective.timeout, Some(Duration::from_secs(30)));

        // Defaults are untouched by the merge.
        assert_eq!(client.headers()["x-partner-version"], "1");
    }

    #[test]
    fn test_request_timeout_wins() {
        let client = ClientOptions::new().with_timeout(Duration::from_secs(30));
        let request = RequestOptions::new().with_timeout(Duration::from_secs(5));
        assert_eq!(
            client.layered(&request).timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            ClientOptions::new().layered(&RequestOptions::new()).timeout,
            None
        );
    }

    #[test]
    fn test_tls_verification_defaults_on() {
        assert!(ClientOptions::default().verify_tls());
        assert!(!ClientOptions::new().with_tls_verification(false).verify_tls());
    }
}
