//! Payment URI resolution.
//!
//! A payment can be started from a plain `https://` payment-request URL or
//! from a wallet URI such as `bitcoin:?r=https://pay.example/i/abc`, whose
//! `r` parameter carries the payment-request URL.
//!
//! # Examples
//!
//! ```rust
//! use jpp::uri::PaymentUri;
//!
//! let uri = PaymentUri::parse("bitcoin:?r=https://pay.example/i/abc").unwrap();
//! assert_eq!(uri.request_url().as_str(), "https://pay.example/i/abc");
//! ```

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ProtocolError;

/// Query parameter of a wallet URI carrying the payment-request URL.
pub const REQUEST_PARAM: &str = "r";

/// A payment URI, resolved once at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUri {
    /// An `http` or `https` URL that is fetched as-is.
    Direct(Url),
    /// A wallet URI (e.g. `bitcoin:`) whose `r` parameter names the URL to fetch.
    Indirect {
        /// The URI as given.
        uri: Url,
        /// The payment-request URL taken from the `r` parameter.
        request_url: Url,
    },
}

impl PaymentUri {
    /// Parses and resolves a payment URI.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidProtocolUri`] if the input is not a
    /// URI, or is a non-HTTP URI without an `http(s)` `r` parameter.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let uri = Url::parse(input.trim())
            .map_err(|e| ProtocolError::InvalidProtocolUri(format!("{input}: {e}")))?;

        if is_http(&uri) {
            return Ok(Self::Direct(uri));
        }

        let request_url = uri
            .query_pairs()
            .find(|(key, _)| key == REQUEST_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ProtocolError::InvalidProtocolUri(format!("{input}: missing `r` parameter"))
            })?;

        let request_url = Url::parse(&request_url)
            .ok()
            .filter(is_http)
            .ok_or_else(|| {
                ProtocolError::InvalidProtocolUri(format!(
                    "{input}: `r` parameter is not an http(s) URL"
                ))
            })?;

        Ok(Self::Indirect { uri, request_url })
    }

    /// Returns the URL the payment request is fetched from.
    #[must_use]
    pub const fn request_url(&self) -> &Url {
        match self {
            Self::Direct(url) | Self::Indirect { request_url: url, .. } => url,
        }
    }

    /// Consumes the URI, returning the URL the payment request is fetched from.
    #[must_use]
    pub fn into_request_url(self) -> Url {
        match self {
            Self::Direct(url) | Self::Indirect { request_url: url, .. } => url,
        }
    }
}

impl FromStr for PaymentUri {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PaymentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(url) | Self::Indirect { uri: url, .. } => write!(f, "{url}"),
        }
    }
}

/// Resolves a payment URI to the payment-request URL to fetch.
///
/// # Errors
///
/// See [`PaymentUri::parse`].
pub fn resolve_payment_uri(input: &str) -> Result<Url, ProtocolError> {
    PaymentUri::parse(input).map(PaymentUri::into_request_url)
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
