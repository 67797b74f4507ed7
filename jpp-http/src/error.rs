//! Error types for the HTTP client.

use http::StatusCode;
use jpp::{BoxError, ProtocolError};

/// Errors that can occur while exchanging messages with a payment server.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The request could not be sent or no response was received.
    #[error("HTTP error: {context}: {source}")]
    Transport {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered a fetch with a status other than 200.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    UnexpectedStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },

    /// A 200 response did not carry the expected JSON.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    MalformedResponse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The response body could not be read.
    #[error("Failed to read response body: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The server refused an unsigned transaction during pre-verification.
    #[error("Payment verification rejected ({status}): {reason}")]
    VerificationRejected {
        /// The HTTP status code.
        status: StatusCode,
        /// The reason given by the server.
        reason: String,
    },

    /// The server refused the signed payment.
    #[error("Payment rejected ({status}): {reason}")]
    SubmissionRejected {
        /// The HTTP status code.
        status: StatusCode,
        /// The reason given by the server.
        reason: String,
    },

    /// Integrity, authentication or input validation failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A wallet collaborator failed while building or signing the payment.
    #[error("Wallet error: {context}: {source}")]
    Wallet {
        /// Human-readable context.
        context: &'static str,
        /// The collaborator's error.
        #[source]
        source: BoxError,
    },

    /// The payer declined a prepared payment, so nothing was sent or broadcast.
    #[error("Payment declined by payer")]
    PaymentDeclined,

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ClientError {
    /// Returns `true` if the failure happened before the server answered, so
    /// repeating the same request may succeed.
    ///
    /// Integrity and authentication failures are never retryable: only a
    /// fresh fetch of the payment request can recover from them.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns the protocol error, if this is one.
    #[must_use]
    pub const fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}
