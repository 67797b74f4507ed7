//! Payment-request integrity checking.
//!
//! The server sends a `Digest: SHA-256=<hex>` header with every payment
//! request. [`parse_payment_request`] recomputes the SHA-256 of the exact body
//! bytes received and refuses the request unless both agree. The signature
//! is computed over this digest, not over the JSON, so this check must pass
//! before anything reads the parsed fields or verifies the signature.

use sha2::{Digest as _, Sha256};
#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::error::ProtocolError;
use crate::headers::{self, ResponseHeaders};
use crate::proto::PaymentRequest;

/// Everything the signature check needs from the response that produced a
/// [`PaymentRequest`].
///
/// Only [`parse_payment_request`] creates this value. It keeps the request
/// that was parsed from the digest-checked body, so signature verification
/// can refuse any other [`PaymentRequest`] presented alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationContext {
    hash: String,
    headers: ResponseHeaders,
    request: PaymentRequest,
}

impl AuthenticationContext {
    /// Hex-encoded SHA-256 of the raw response body.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Headers of the response the request was parsed from.
    #[must_use]
    pub const fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// The request parsed from the body this context authenticated.
    #[must_use]
    pub const fn request(&self) -> &PaymentRequest {
        &self.request
    }

    /// Returns `true` if `request` is the one this context was parsed with.
    #[must_use]
    pub fn authenticates(&self, request: &PaymentRequest) -> bool {
        self.request == *request
    }
}

/// Returns the lower-case hex SHA-256 of `body`.
#[must_use]
pub fn sha256_hex(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Parses a raw payment-request body and checks it against its `Digest` header.
///
/// # Errors
///
/// - [`ProtocolError::MissingParameter`] if `raw_body` or `headers` is empty
/// - [`ProtocolError::MalformedJson`] if the body is not a payment request
/// - [`ProtocolError::MissingDigest`] if there is no usable `Digest` header
/// - [`ProtocolError::DigestMismatch`] if the body hash differs from the header
pub fn parse_payment_request(
    raw_body: &[u8],
    headers: &ResponseHeaders,
) -> Result<(PaymentRequest, AuthenticationContext), ProtocolError> {
    if raw_body.is_empty() {
        return Err(ProtocolError::MissingParameter("raw_body"));
    }
    if headers.is_empty() {
        return Err(ProtocolError::MissingParameter("headers"));
    }

    let payment_request: PaymentRequest = serde_json::from_slice(raw_body)
        .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;

    let expected = headers
        .get(headers::DIGEST)
        .and_then(headers::digest_value)
        .ok_or(ProtocolError::MissingDigest)?;
    let actual = sha256_hex(raw_body);

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ProtocolError::DigestMismatch {
            actual,
            expected: expected.to_owned(),
        });
    }

    #[cfg(feature = "telemetry")]
    debug!(
        digest = %actual,
        network = %payment_request.network,
        outputs = payment_request.outputs.len(),
        "Payment request body matches digest"
    );

    let context = AuthenticationContext {
        hash: actual,
        headers: headers.clone(),
        request: payment_request.clone(),
    };
    Ok((payment_request, context))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"network":"test","currency":"BTC","outputs":[{"address":"1Addr","amount":100000000}],"paymentUrl":"https://pay.example/p"}"#;

    fn headers_for(body: &[u8]) -> ResponseHeaders {
        ResponseHeaders::new().with("Digest", format!("SHA-256={}", sha256_hex(body)))
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_matching_digest_is_accepted() {
        let (pr, ctx) = parse_payment_request(BODY.as_bytes(), &headers_for(BODY.as_bytes())).unwrap();
        assert_eq!(pr.currency, "BTC");
        assert_eq!(ctx.hash(), sha256_hex(BODY.as_bytes()));
        assert!(ctx.headers().get("digest").is_some());
        assert!(ctx.authenticates(&pr));
    }

    #[test]
    fn test_context_only_authenticates_its_own_request() {
        let (mut pr, ctx) =
            parse_payment_request(BODY.as_bytes(), &headers_for(BODY.as_bytes())).unwrap();
        pr.outputs[0].address = "1Other".to_owned();
        assert!(!ctx.authenticates(&pr));
        assert_eq!(ctx.request().outputs[0].address, "1Addr");
    }

    #[test]
    fn test_uppercase_digest_is_accepted() {
        let headers = ResponseHeaders::new().with(
            "digest",
            format!("SHA-256={}", sha256_hex(BODY.as_bytes()).to_uppercase()),
        );
        assert!(parse_payment_request(BODY.as_bytes(), &headers).is_ok());
    }

    #[test]
    fn test_tampered_body_reports_both_hashes() {
        let headers = headers_for(BODY.as_bytes());
        let tampered = BODY.replace("100000000", "900000000");
        let err = parse_payment_request(tampered.as_bytes(), &headers).unwrap_err();
        match err {
            ProtocolError::DigestMismatch { actual, expected } => {
                assert_eq!(actual, sha256_hex(tampered.as_bytes()));
                assert_eq!(expected, sha256_hex(BODY.as_bytes()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_whitespace_changes_the_digest() {
        let headers = headers_for(BODY.as_bytes());
        let reformatted = format!("{BODY}\n");
        assert!(matches!(
            parse_payment_request(reformatted.as_bytes(), &headers),
            Err(ProtocolError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_inputs() {
        assert_eq!(
            parse_payment_request(b"", &headers_for(b"")).unwrap_err(),
            ProtocolError::MissingParameter("raw_body")
        );
        assert_eq!(
            parse_payment_request(BODY.as_bytes(), &ResponseHeaders::new()).unwrap_err(),
            ProtocolError::MissingParameter("headers")
        );
    }

    #[test]
    fn test_malformed_json_is_checked_before_digest() {
        let headers = ResponseHeaders::new().with("content-type", "application/payment-request");
        assert!(matches!(
            parse_payment_request(b"{not json", &headers),
            Err(ProtocolError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_missing_digest() {
        let headers = ResponseHeaders::new().with("content-type", "application/payment-request");
        assert_eq!(
            parse_payment_request(BODY.as_bytes(), &headers).unwrap_err(),
            ProtocolError::MissingDigest
        );
        let malformed = ResponseHeaders::new().with("digest", "no-separator");
        assert_eq!(
            parse_payment_request(BODY.as_bytes(), &malformed).unwrap_err(),
            ProtocolError::MissingDigest
        );
    }
}
