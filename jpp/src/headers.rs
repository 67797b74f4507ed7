//! Response header names and a case-insensitive header map.
//!
//! The integrity and signature checks read a handful of headers from the
//! payment-request response. [`ResponseHeaders`] stores them with lower-cased
//! names so lookups do not depend on how the server spelled them.

use std::collections::BTreeMap;

/// SHA-256 digest of the response body, formatted `<algo>=<hex>`.
pub const DIGEST: &str = "digest";

/// Hex-encoded signature over the digest.
pub const SIGNATURE: &str = "signature";

/// Signature scheme of the `signature` header.
pub const X_SIGNATURE_TYPE: &str = "x-signature-type";

/// Public-key hash identifying the signing key.
pub const X_IDENTITY: &str = "x-identity";

/// The only signature scheme this client verifies (secp256k1 ECDSA).
pub const SIGNATURE_TYPE_ECC: &str = "ecc";

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any value stored under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value of a header, ignoring name case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the number of stored headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no headers are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ResponseHeaders
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Extracts the hex value of a `Digest` header.
///
/// The algorithm token before the first `=` is discarded. Returns `None` when
/// the header has no `=` or the value after it is empty.
#[must_use]
pub fn digest_value(header: &str) -> Option<&str> {
    let (_algorithm, value) = header.split_once('=')?;
    let value = value.trim();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let headers = ResponseHeaders::new().with("X-Identity", "mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc");
        assert_eq!(
            headers.get("x-identity"),
            Some("mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc")
        );
        assert_eq!(
            headers.get("X-IDENTITY"),
            Some("mh65MN7drqmwpCRZcEeBEE9ceQCQ95HtZc")
        );
    }

    #[test]
    fn test_digest_value_discards_algorithm() {
        assert_eq!(digest_value("SHA-256=abcd"), Some("abcd"));
        assert_eq!(digest_value("sha-256= abcd "), Some("abcd"));
    }

    #[test]
    fn test_digest_value_rejects_malformed() {
        assert_eq!(digest_value("abcd"), None);
        assert_eq!(digest_value("SHA-256="), None);
    }
}
