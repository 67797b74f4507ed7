//! Error types for the JSON Payment Protocol core.
//!
//! Every variant is fatal to the exchange it was raised in. Integrity and
//! authentication failures must reach the caller unmodified; only a fresh
//! fetch of the payment request can recover from them.

/// Errors raised while resolving, validating, or authenticating a payment
/// request, or while preparing a payment for submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The payment URI is neither an `http(s)` URL nor carries an `r` parameter.
    #[error("Invalid payment protocol URI: {0}")]
    InvalidProtocolUri(String),

    /// A required input was empty or absent.
    #[error("Parameter {0} is required")]
    MissingParameter(&'static str),

    /// The response body is not a JSON payment request.
    #[error("Unable to parse payment request: {0}")]
    MalformedJson(String),

    /// The response carried no usable `Digest` header.
    #[error("Digest missing from response headers")]
    MissingDigest,

    /// The body hash does not match the `Digest` header.
    #[error("Response body hash does not match digest header. Actual: {actual} Expected: {expected}")]
    DigestMismatch {
        /// SHA-256 of the received body, hex encoded.
        actual: String,
        /// Digest value announced by the server.
        expected: String,
    },

    /// The payment request handed to signature verification is not the one
    /// its authentication context was parsed with.
    #[error("Payment request does not match the response it was authenticated from")]
    UnauthenticatedRequest,

    /// A header needed for signature verification is absent.
    #[error("Missing signature header: {0}")]
    MissingSignatureHeader(&'static str),

    /// The `x-signature-type` header is empty or malformed.
    #[error("Invalid signature type header: {0:?}")]
    InvalidSignatureType(String),

    /// The declared signature scheme is not supported.
    #[error("Unsupported signature type: {0}")]
    UnsupportedSignatureType(String),

    /// The URL the request was fetched from has no usable host.
    #[error("Invalid request URL: {0}")]
    InvalidRequestUrl(String),

    /// The `x-identity` header names an identity absent from the key registry.
    #[error("Identity {0} is not trusted")]
    UntrustedIdentity(String),

    /// The identity is trusted, but not for the host that served the request.
    #[error("Identity {identity} is not trusted for domain {host}")]
    DomainNotTrusted {
        /// Identity from the `x-identity` header.
        identity: String,
        /// Host the payment request was fetched from.
        host: String,
    },

    /// The identity is trusted, but not for the network the request names.
    #[error("Identity {identity} is not trusted for network {network}")]
    NetworkNotTrusted {
        /// Identity from the `x-identity` header.
        identity: String,
        /// Network named by the payment request.
        network: String,
    },

    /// The signature does not decode or does not verify against the trusted key.
    #[error("Response signature is invalid")]
    InvalidSignature,

    /// A transaction supplied by the caller is not a hexadecimal string.
    #[error("Transaction must be a non-empty, even-length hexadecimal string")]
    InvalidTransactionEncoding,

    /// A trusted-key entry carries a public key that is not a secp256k1 point.
    #[error("Invalid public key for identity {identity}: {reason}")]
    InvalidPublicKey {
        /// Identity whose key failed to decode.
        identity: String,
        /// Decoder message.
        reason: String,
    },

    /// The fee rate announced by the server is negative or not finite.
    #[error("Invalid fee rate: {0}")]
    InvalidFeeRate(String),

    /// The payment request targets a different network than the caller expects.
    #[error("Payment request is for network {actual}, expected {expected}")]
    NetworkMismatch {
        /// Network the caller is configured for.
        expected: String,
        /// Network named by the payment request.
        actual: String,
    },

    /// The payment request asks for a different currency than the caller expects.
    #[error("Payment request is for currency {actual}, expected {expected}")]
    CurrencyMismatch {
        /// Currency the caller is configured for.
        expected: String,
        /// Currency named by the payment request.
        actual: String,
    },

    /// The payment request's `expires` time has passed.
    #[error("Payment request expired at {0}")]
    RequestExpired(String),
}

impl ProtocolError {
    /// Returns `true` for failures of the digest check.
    #[must_use]
    pub const fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::MalformedJson(_)
                | Self::MissingDigest
                | Self::DigestMismatch { .. }
                | Self::UnauthenticatedRequest
        )
    }

    /// Returns `true` for failures of the signature check.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingSignatureHeader(_)
                | Self::InvalidSignatureType(_)
                | Self::UnsupportedSignatureType(_)
                | Self::InvalidRequestUrl(_)
                | Self::UntrustedIdentity(_)
                | Self::DomainNotTrusted { .. }
                | Self::NetworkNotTrusted { .. }
                | Self::InvalidSignature
        )
    }
}
